//! Results-page source: fetches one day's page and scrapes the prize table.
//!
//! The page layout is only loosely stable, so parsing is a tolerant scan over
//! the raw HTML: locate the results block by class, then read every prize
//! cell by its class name. Anything missing is reported as `NotPublished`
//! rather than an error.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::{date_format, Config, REGION_CODE};
use crate::error::{AppError, Result};
use crate::types::{DrawRecord, PrizeDigit, PrizeTier};

/// One day's prize table as scraped, before storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedDraw {
    pub date: NaiveDate,
    /// Digits of the special prize.
    pub special_prize_raw: String,
    pub digits: Vec<PrizeDigit>,
}

impl ScrapedDraw {
    pub fn into_record(self) -> DrawRecord {
        DrawRecord {
            date: self.date,
            region: REGION_CODE.to_string(),
            special_prize_raw: Some(self.special_prize_raw),
            digits: self.digits,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedPage {
    /// No usable result for the date (yet); carries a short reason.
    NotPublished(String),
    Draw(ScrapedDraw),
}

#[async_trait]
pub trait DrawSource: Send + Sync {
    async fn fetch_draw(&self, date: NaiveDate) -> Result<FetchedPage>;
}

pub struct MinhNgocSource {
    client: reqwest::Client,
    base_url: String,
}

impl MinhNgocSource {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.source_timeout_secs))
            .user_agent(cfg.source_user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.source_base_url.clone(),
        })
    }

    pub fn page_url(&self, date: NaiveDate) -> String {
        format!("{}/{}.html", self.base_url, date.format(date_format::DASHED))
    }
}

#[async_trait]
impl DrawSource for MinhNgocSource {
    async fn fetch_draw(&self, date: NaiveDate) -> Result<FetchedPage> {
        let url = self.page_url(date);
        debug!(%date, %url, "Fetching results page");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(FetchedPage::NotPublished(format!("no results page for {}", date.format(date_format::DASHED))));
        }
        if !status.is_success() {
            return Err(AppError::Source(format!("{url} answered {status}")));
        }

        let html = resp.text().await?;
        Ok(parse_results_page(&html, date))
    }
}

// ---------------------------------------------------------------------------
// Page parsing
// ---------------------------------------------------------------------------

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static CLASSED_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<([a-z][a-z0-9]*)\b[^>]*?\bclass\s*=\s*["']([^"']*)["'][^>]*>"#).unwrap()
});
static ANY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(/?)([a-z][a-z0-9]*)\b[^>]*?(/?)>").unwrap());
static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-]+").unwrap());

const BLOCK_CLASSES: [&str; 2] = ["box_kqxs", "bkqt"];

/// Cell classes used for each tier, current name first.
fn tier_classes(tier: PrizeTier) -> [&'static str; 2] {
    match tier {
        PrizeTier::Special => ["giai_db", "giaidb"],
        PrizeTier::First => ["giai_nhat", "giai1"],
        PrizeTier::Second => ["giai_nhi", "giai2"],
        PrizeTier::Third => ["giai_ba", "giai3"],
        PrizeTier::Fourth => ["giai_tu", "giai4"],
        PrizeTier::Fifth => ["giai_nam", "giai5"],
        PrizeTier::Sixth => ["giai_sau", "giai6"],
        PrizeTier::Seventh => ["giai_bay", "giai7"],
    }
}

/// Turns a results page into a draw for `date`.
pub fn parse_results_page(html: &str, date: NaiveDate) -> FetchedPage {
    let slashed = date.format(date_format::SLASHED).to_string();

    let title = TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str());
    if title.contains("404") {
        return FetchedPage::NotPublished(format!("results page for {slashed} not found"));
    }
    if !element_text(html).contains(&slashed) {
        return FetchedPage::NotPublished(format!("page does not mention {slashed}"));
    }

    let Some(block) = BLOCK_CLASSES
        .iter()
        .find_map(|class| elements_with_class(html, &[*class]).into_iter().next())
    else {
        return FetchedPage::NotPublished("results table not found".to_string());
    };

    let special = PrizeDigit::from_raw(PrizeTier::Special, &prize_text(block, PrizeTier::Special));
    if special.full_number.is_empty() {
        return FetchedPage::NotPublished(format!("special prize for {slashed} not drawn yet"));
    }

    let special_prize_raw = special.full_number.clone();
    let mut digits = vec![special];
    for tier in PrizeTier::ALL.into_iter().skip(1) {
        let text = prize_text(block, tier);
        digits.extend(
            SPLIT_RE
                .split(&text)
                .filter(|token| !token.is_empty())
                .map(|token| PrizeDigit::from_raw(tier, token)),
        );
    }

    FetchedPage::Draw(ScrapedDraw {
        date,
        special_prize_raw,
        digits,
    })
}

/// Text of every cell for `tier`, joined by spaces.
fn prize_text(block: &str, tier: PrizeTier) -> String {
    elements_with_class(block, &tier_classes(tier))
        .into_iter()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inner HTML of each outermost element carrying any of `classes`, in
/// document order. Matches nested inside an earlier match are skipped.
fn elements_with_class<'a>(html: &'a str, classes: &[&str]) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut consumed = 0;

    for caps in CLASSED_TAG_RE.captures_iter(html) {
        let (Some(open), Some(tag), Some(attr)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if open.start() < consumed {
            continue;
        }
        if !attr.as_str().split_whitespace().any(|c| classes.contains(&c)) {
            continue;
        }
        let (inner, end) = element_inner(html, open.end(), tag.as_str());
        found.push(inner);
        consumed = end;
    }

    found
}

/// Inner HTML of the element whose opening tag ends at `content_start`, and
/// the offset just past its closing tag. Unclosed elements run to the end.
fn element_inner<'a>(html: &'a str, content_start: usize, tag: &str) -> (&'a str, usize) {
    let rest = &html[content_start..];
    let mut depth = 1usize;

    for caps in ANY_TAG_RE.captures_iter(rest) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        if !name.as_str().eq_ignore_ascii_case(tag) {
            continue;
        }
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(3).is_some_and(|m| !m.as_str().is_empty());
        if closing {
            depth -= 1;
            if depth == 0 {
                return (&rest[..whole.start()], content_start + whole.end());
            }
        } else if !self_closing {
            depth += 1;
        }
    }

    (rest, html.len())
}

/// Visible text with tags removed and whitespace collapsed.
fn element_text(html: &str) -> String {
    let stripped = STRIP_RE.replace_all(html, " ");
    stripped
        .replace("&nbsp;", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
