use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::health::{CrawlGuard, HealthState};
use crate::db::DrawStore;
use crate::error::{AppError, Result};
use crate::ingest::source::{DrawSource, FetchedPage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    Saved,
    AlreadyExists,
    NotPublished(String),
}

impl std::fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrawlOutcome::Saved => write!(f, "saved"),
            CrawlOutcome::AlreadyExists => write!(f, "already exists"),
            CrawlOutcome::NotPublished(reason) => write!(f, "not published: {reason}"),
        }
    }
}

/// Per-day tallies of one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSummary {
    pub saved: usize,
    pub already_existed: usize,
    pub not_published: usize,
    pub failed: usize,
}

impl CrawlSummary {
    fn count(&mut self, outcome: &CrawlOutcome) {
        match outcome {
            CrawlOutcome::Saved => self.saved += 1,
            CrawlOutcome::AlreadyExists => self.already_existed += 1,
            CrawlOutcome::NotPublished(_) => self.not_published += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoUpdate {
    /// Nothing stored yet, so there is no date to continue from.
    Empty,
    UpToDate,
    Crawled {
        from: NaiveDate,
        to: NaiveDate,
        summary: CrawlSummary,
    },
}

/// Pulls draws from a source into the store, one crawl at a time.
pub struct Crawler {
    source: Arc<dyn DrawSource>,
    store: DrawStore,
    health: Arc<HealthState>,
    delay: Duration,
}

impl Crawler {
    pub fn new(source: Arc<dyn DrawSource>, store: DrawStore, health: Arc<HealthState>, delay: Duration) -> Self {
        Self {
            source,
            store,
            health,
            delay,
        }
    }

    #[cfg(test)]
    pub fn health(&self) -> &Arc<HealthState> {
        &self.health
    }

    pub async fn crawl_date(&self, date: NaiveDate) -> Result<CrawlOutcome> {
        let _guard = self.claim()?;
        self.ingest(date).await
    }

    /// Claims the crawl slot, then crawls every day in `[from, to]` on a
    /// background task that holds it until done. Busy if the slot is taken.
    /// Failures on one day are logged and counted; the run continues with the
    /// next day.
    pub fn crawl_range(self: &Arc<Self>, from: NaiveDate, to: NaiveDate) -> Result<JoinHandle<CrawlSummary>> {
        let guard = self.claim()?;
        let crawler = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let _guard = guard;
            crawler.ingest_range(from, to).await
        }))
    }

    /// Continues from the day after the latest stored draw through `today`.
    pub async fn auto_update(&self, today: NaiveDate) -> Result<AutoUpdate> {
        let _guard = self.claim()?;

        let Some(latest) = self.store.latest_draw_date().await? else {
            return Ok(AutoUpdate::Empty);
        };
        let Some(from) = latest.checked_add_days(Days::new(1)).filter(|d| *d <= today) else {
            return Ok(AutoUpdate::UpToDate);
        };

        let summary = self.ingest_range(from, today).await;
        Ok(AutoUpdate::Crawled {
            from,
            to: today,
            summary,
        })
    }

    fn claim(&self) -> Result<CrawlGuard> {
        self.health
            .try_begin_crawl()
            .ok_or_else(|| AppError::Busy("a crawl is already running".to_string()))
    }

    async fn ingest(&self, date: NaiveDate) -> Result<CrawlOutcome> {
        if self.store.exists_by_date(date).await? {
            return Ok(CrawlOutcome::AlreadyExists);
        }

        let outcome = match self.source.fetch_draw(date).await? {
            FetchedPage::NotPublished(reason) => CrawlOutcome::NotPublished(reason),
            FetchedPage::Draw(draw) => {
                if self.store.insert_record(&draw.into_record()).await? {
                    self.health.record_saved();
                    CrawlOutcome::Saved
                } else {
                    CrawlOutcome::AlreadyExists
                }
            }
        };

        info!(%date, outcome = %outcome, "Crawled draw");
        Ok(outcome)
    }

    async fn ingest_range(&self, from: NaiveDate, to: NaiveDate) -> CrawlSummary {
        let mut summary = CrawlSummary::default();

        for (i, date) in from.iter_days().take_while(|d| *d <= to).enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.ingest(date).await {
                Ok(outcome) => summary.count(&outcome),
                Err(e) => {
                    warn!(%date, "Crawl failed: {e}");
                    summary.failed += 1;
                }
            }
        }

        info!(
            %from,
            %to,
            saved = summary.saved,
            already_existed = summary.already_existed,
            not_published = summary.not_published,
            failed = summary.failed,
            "Crawl run complete",
        );
        summary
    }
}
