use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analysis::{analyze, ClassificationMode, RangeBounds};
use crate::api::health::HealthState;
use crate::api::latency::{LatencySnapshot, LatencyStats};
use crate::config::{date_format, paging, ANALYSIS_DEFAULT_LOOKBACK_DAYS};
use crate::db::DrawStore;
use crate::error::AppError;
use crate::ingest::{AutoUpdate, CrawlOutcome, CrawlSummary, Crawler};
use crate::stats::{load_dashboard, DashboardQuery, DashboardStats, ForecastRange};
use crate::types::{AnalysisRow, DrawRecord, EmptyStreakStat, PrizeTier, StreakCount, TrackedField};

#[derive(Clone)]
pub struct ApiState {
    pub store: DrawStore,
    pub crawler: Arc<Crawler>,
    pub health: Arc<HealthState>,
    pub analysis_latency: Arc<LatencyStats>,
    pub dashboard_latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(get_health))
        .route("/api/analysis", get(get_analysis))
        .route("/api/dashboard/stats", get(get_dashboard_stats))
        .route("/api/lottery", get(get_lottery))
        .route("/api/crawl/single", get(crawl_single))
        .route("/api/crawl/range", get(crawl_range))
        .route("/api/crawl/auto-update", get(crawl_auto_update))
        .route("/api/stats/latency", get(get_stats_latency))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_date(value: &str, format: &str, param: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), format)
        .map_err(|_| AppError::BadRequest(format!("invalid {param} {value:?}")))
}

fn slashed(date: NaiveDate) -> String {
    date.format(date_format::SLASHED).to_string()
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisQuery {
    /// yyyy-MM-dd
    pub from_date: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub analysis_type: Option<String>,
    #[serde(rename = "dauDBStart")]
    pub dau_db_start: Option<i32>,
    #[serde(rename = "dauDBEnd")]
    pub dau_db_end: Option<i32>,
    pub db_start: Option<i32>,
    pub db_end: Option<i32>,
    pub dau_g1_start: Option<i32>,
    pub dau_g1_end: Option<i32>,
    pub g1_start: Option<i32>,
    pub g1_end: Option<i32>,
}

impl AnalysisQuery {
    fn bounds(&self) -> [RangeBounds; 4] {
        let mut bounds = [RangeBounds::default(); 4];
        bounds[TrackedField::DauDb.index()] = RangeBounds::new(self.dau_db_start, self.dau_db_end);
        bounds[TrackedField::Db.index()] = RangeBounds::new(self.db_start, self.db_end);
        bounds[TrackedField::DauG1.index()] = RangeBounds::new(self.dau_g1_start, self.dau_g1_end);
        bounds[TrackedField::G1.index()] = RangeBounds::new(self.g1_start, self.g1_end);
        bounds
    }

    /// (page, size) after clamping.
    fn paging(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(0).max(0);
        let size = self
            .size
            .unwrap_or(paging::DEFAULT_SIZE)
            .clamp(paging::MIN_SIZE, paging::MAX_SIZE);
        (page, size)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardParams {
    pub month: Option<String>,
    pub lo_gan_month: Option<String>,
    pub lo_hot_month: Option<String>,
    pub algorithm: Option<String>,
    /// Wide enough that negative or huge widths reach the forecast fallback.
    pub range_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LotteryQuery {
    /// yyyy-MM-dd
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct CrawlDateQuery {
    /// dd-MM-yyyy
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct CrawlRangeQuery {
    /// dd-MM-yyyy
    pub from: String,
    /// dd-MM-yyyy
    pub to: String,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub rows: Vec<AnalysisRowResponse>,
    pub empty_stats: Vec<EmptyStatsResponse>,
    pub total_pages: i64,
    pub current_page: i64,
    pub total_elements: i64,
}

#[derive(Debug, Serialize)]
pub struct AnalysisRowResponse {
    /// dd-MM-yyyy
    pub date: String,
    #[serde(rename = "dauDB")]
    pub dau_db: Option<u8>,
    pub db: Option<u8>,
    #[serde(rename = "dauG1")]
    pub dau_g1: Option<u8>,
    pub g1: Option<u8>,
    #[serde(rename = "dauDBMatch")]
    pub dau_db_match: u8,
    #[serde(rename = "dbMatch")]
    pub db_match: u8,
    #[serde(rename = "dauG1Match")]
    pub dau_g1_match: u8,
    #[serde(rename = "g1Match")]
    pub g1_match: u8,
}

impl From<&AnalysisRow> for AnalysisRowResponse {
    fn from(row: &AnalysisRow) -> Self {
        Self {
            date: row.date.format(date_format::DASHED).to_string(),
            dau_db: row.value(TrackedField::DauDb),
            db: row.value(TrackedField::Db),
            dau_g1: row.value(TrackedField::DauG1),
            g1: row.value(TrackedField::G1),
            dau_db_match: row.code(TrackedField::DauDb),
            db_match: row.code(TrackedField::Db),
            dau_g1_match: row.code(TrackedField::DauG1),
            g1_match: row.code(TrackedField::G1),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyStatsResponse {
    pub column_name: &'static str,
    pub range: String,
    pub counts: Vec<StreakCount>,
}

impl From<EmptyStreakStat> for EmptyStatsResponse {
    fn from(stat: EmptyStreakStat) -> Self {
        Self {
            column_name: stat.field.label(),
            range: stat.range,
            counts: stat.counts,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_days: i64,
    /// dd/MM/yyyy
    pub last_update_date: Option<String>,
    pub top_lo_gan: Vec<LoGanResponse>,
    pub top_lo_hot: Vec<LoHotResponse>,
    pub quick_forecast: QuickForecastResponse,
    pub recommendation: RecommendationResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoGanResponse {
    pub number: u8,
    pub days_since_last_appearance: i64,
    pub last_appearance_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoHotResponse {
    pub number: u8,
    pub frequency: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickForecastResponse {
    pub range_start: u32,
    pub range_end: u32,
    pub confidence_score: f64,
    pub algorithm_used: &'static str,
}

impl From<&ForecastRange> for QuickForecastResponse {
    fn from(range: &ForecastRange) -> Self {
        Self {
            range_start: range.start,
            range_end: range.end,
            confidence_score: range.confidence,
            algorithm_used: range.algorithm.name(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub recommended_algorithm: &'static str,
    pub recommended_range_size: u32,
    pub recommended_range_start: u32,
    pub recommended_range_end: u32,
    pub recommended_confidence_score: f64,
    pub reason: String,
}

impl From<DashboardStats> for DashboardResponse {
    fn from(stats: DashboardStats) -> Self {
        let rec = &stats.recommendation.range;
        Self {
            total_days: stats.total_days,
            last_update_date: stats.last_update.map(slashed),
            top_lo_gan: stats
                .cold
                .iter()
                .map(|c| LoGanResponse {
                    number: c.number,
                    days_since_last_appearance: c.days_since_last,
                    last_appearance_date: slashed(c.last_appearance),
                })
                .collect(),
            top_lo_hot: stats
                .hot
                .iter()
                .map(|h| LoHotResponse {
                    number: h.number,
                    frequency: h.frequency,
                })
                .collect(),
            quick_forecast: QuickForecastResponse::from(&stats.forecast),
            recommendation: RecommendationResponse {
                recommended_algorithm: rec.algorithm.name(),
                recommended_range_size: rec.range_size,
                recommended_range_start: rec.start,
                recommended_range_end: rec.end,
                recommended_confidence_score: rec.confidence,
                reason: stats.recommendation.reason.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryResponse {
    /// dd/MM/yyyy
    pub date: String,
    /// Mon=2 .. Sat=7, Sun=8.
    pub day_of_week: String,
    pub codes: Option<Vec<String>>,
    pub special_prize: String,
    pub prize1: String,
    pub prize2: Vec<String>,
    pub prize3: Vec<String>,
    pub prize4: Vec<String>,
    pub prize5: Vec<String>,
    pub prize6: Vec<String>,
    pub prize7: Vec<String>,
}

impl From<&DrawRecord> for LotteryResponse {
    fn from(record: &DrawRecord) -> Self {
        let numbers = |tier| prize_numbers(record, tier);
        Self {
            date: slashed(record.date),
            day_of_week: (record.date.weekday().number_from_monday() + 1).to_string(),
            codes: None,
            special_prize: record.special_prize_raw.clone().unwrap_or_default(),
            prize1: numbers(PrizeTier::First).into_iter().next().unwrap_or_default(),
            prize2: numbers(PrizeTier::Second),
            prize3: numbers(PrizeTier::Third),
            prize4: numbers(PrizeTier::Fourth),
            prize5: numbers(PrizeTier::Fifth),
            prize6: numbers(PrizeTier::Sixth),
            prize7: numbers(PrizeTier::Seventh),
        }
    }
}

/// Display strings for a tier: the full number, else the raw special prize
/// (special tier only), else the zero-padded two-digit value.
fn prize_numbers(record: &DrawRecord, tier: PrizeTier) -> Vec<String> {
    let raw = record.special_prize_raw.as_deref().filter(|s| !s.is_empty());
    record
        .digits_of(tier)
        .map(|d| {
            if !d.full_number.is_empty() {
                return d.full_number.clone();
            }
            match (tier, raw) {
                (PrizeTier::Special, Some(raw)) => raw.to_string(),
                _ => d.last_two.map(|v| format!("{v:02}")).unwrap_or_default(),
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CrawlSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub total_days: i64,
    pub crawl_running: bool,
    /// Unix ms of the last saved draw; None before the first save.
    pub last_ingest_at_ms: Option<u64>,
    pub records_saved: u64,
}

#[derive(Debug, Serialize)]
pub struct LatencyResponse {
    pub analysis: LatencySnapshot,
    pub dashboard: LatencySnapshot,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_analysis(
    State(state): State<ApiState>,
    Query(params): Query<AnalysisQuery>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let tag = params.analysis_type.as_deref().unwrap_or(crate::analysis::classifier::TAG_RANGE);
    let mode = ClassificationMode::from_tag(tag, params.bounds())
        .ok_or_else(|| AppError::BadRequest(format!("unknown analysisType {tag:?}")))?;
    let from = match params.from_date.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(s) => parse_date(s, date_format::ISO, "fromDate")?,
        None => today() - Duration::days(ANALYSIS_DEFAULT_LOOKBACK_DAYS),
    };
    let (page, size) = params.paging();

    let records = state.store.find_records_from(from).await?;
    let report = state.analysis_latency.time(|| analyze(&records, &mode));

    let total_elements = report.rows.len() as i64;
    let total_pages = (total_elements + size - 1) / size;
    let rows = report
        .rows
        .iter()
        .skip(page.saturating_mul(size) as usize)
        .take(size as usize)
        .map(AnalysisRowResponse::from)
        .collect();

    Ok(Json(AnalysisResponse {
        rows,
        empty_stats: report.stats.into_iter().map(EmptyStatsResponse::from).collect(),
        total_pages,
        current_page: page,
        total_elements,
    }))
}

async fn get_dashboard_stats(
    State(state): State<ApiState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, AppError> {
    let query = DashboardQuery::from_params(
        params.month.as_deref(),
        params.lo_gan_month.as_deref(),
        params.lo_hot_month.as_deref(),
        params.algorithm.as_deref(),
        params.range_size,
    )?;

    let started = Instant::now();
    let stats = load_dashboard(&state.store, &query, today()).await?;
    state.dashboard_latency.record(started.elapsed());

    Ok(Json(DashboardResponse::from(stats)))
}

async fn get_lottery(
    State(state): State<ApiState>,
    Query(params): Query<LotteryQuery>,
) -> Result<Json<LotteryResponse>, AppError> {
    let date = parse_date(&params.date, date_format::ISO, "date")?;
    let record = state
        .store
        .find_by_date(date)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no draw stored for {}", slashed(date))))?;
    Ok(Json(LotteryResponse::from(&record)))
}

async fn crawl_single(
    State(state): State<ApiState>,
    Query(params): Query<CrawlDateQuery>,
) -> Result<Json<CrawlResponse>, AppError> {
    let date = parse_date(&params.date, date_format::DASHED, "date")?;
    let outcome = state.crawler.crawl_date(date).await?;

    let status = match outcome {
        CrawlOutcome::Saved => "saved",
        CrawlOutcome::AlreadyExists => "alreadyExists",
        CrawlOutcome::NotPublished(_) => "notPublished",
    };
    Ok(Json(CrawlResponse {
        status,
        message: format!("{}: {outcome}", slashed(date)),
        summary: None,
    }))
}

/// Claims the crawl slot, starts the crawl in the background and answers
/// right away. 409 if another crawl holds the slot.
async fn crawl_range(
    State(state): State<ApiState>,
    Query(params): Query<CrawlRangeQuery>,
) -> Result<(StatusCode, Json<CrawlResponse>), AppError> {
    let from = parse_date(&params.from, date_format::DASHED, "from")?;
    let to = parse_date(&params.to, date_format::DASHED, "to")?;
    if from > to {
        return Err(AppError::BadRequest("from must not be after to".to_string()));
    }

    let task = state.crawler.crawl_range(from, to)?;
    tokio::spawn(async move {
        if let Err(e) = task.await {
            warn!(%from, %to, "Range crawl task failed: {e}");
        }
    });
    info!(%from, %to, "Range crawl started");

    Ok((
        StatusCode::ACCEPTED,
        Json(CrawlResponse {
            status: "started",
            message: format!("crawling {} to {} in the background", slashed(from), slashed(to)),
            summary: None,
        }),
    ))
}

async fn crawl_auto_update(State(state): State<ApiState>) -> Result<Json<CrawlResponse>, AppError> {
    let response = match state.crawler.auto_update(today()).await? {
        AutoUpdate::Empty => CrawlResponse {
            status: "empty",
            message: "no draws stored yet; run a range crawl first".to_string(),
            summary: None,
        },
        AutoUpdate::UpToDate => CrawlResponse {
            status: "upToDate",
            message: "already up to date".to_string(),
            summary: None,
        },
        AutoUpdate::Crawled { from, to, summary } => CrawlResponse {
            status: "crawled",
            message: format!("updated {} to {}", slashed(from), slashed(to)),
            summary: Some(summary),
        },
    };
    Ok(Json(response))
}

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, AppError> {
    let total_days = state.store.count_draws().await?;
    let last = state.health.last_ingest_at_ms();
    Ok(Json(HealthResponse {
        status: "ok",
        total_days,
        crawl_running: state.health.crawl_running(),
        last_ingest_at_ms: (last > 0).then_some(last),
        records_saved: state.health.records_saved(),
    }))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    Json(LatencyResponse {
        analysis: state.analysis_latency.snapshot(),
        dashboard: state.dashboard_latency.snapshot(),
    })
}
