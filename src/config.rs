use crate::error::{AppError, Result};

pub const SOURCE_BASE_URL: &str = "https://www.minhngoc.net.vn/ket-qua-xo-so/mien-bac";
pub const SOURCE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Region code stored on every ingested draw (northern draw).
pub const REGION_CODE: &str = "MB";

/// Runs shorter than this are not reported as streaks.
pub const MIN_STREAK_LEN: usize = 3;

/// Length of the cold and hot rankings.
pub const RANKING_TOP_N: usize = 10;

/// Default hot window: today minus this many days, through today.
pub const HOT_DEFAULT_WINDOW_DAYS: i64 = 30;

/// Default analysis start when the caller gives no `fromDate`.
pub const ANALYSIS_DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Pagination limits for analysis rows.
pub mod paging {
    pub const DEFAULT_SIZE: i64 = 30;
    pub const MIN_SIZE: i64 = 1;
    pub const MAX_SIZE: i64 = 100;
}

/// Forecast range-size bounds (inclusive) and the fallback size.
pub mod forecast_range {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 60;
    pub const STEP: usize = 5;
    pub const DEFAULT: u32 = 20;
}

/// Wire date formats.
pub mod date_format {
    /// Analysis rows, crawl parameters.
    pub const DASHED: &str = "%d-%m-%Y";
    /// Dashboard and lottery lookup.
    pub const SLASHED: &str = "%d/%m/%Y";
    /// Query parameters.
    pub const ISO: &str = "%Y-%m-%d";
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Results page base URL; the page is `{base}/{dd-MM-yyyy}.html` (SOURCE_BASE_URL)
    pub source_base_url: String,
    pub source_user_agent: String,
    pub source_timeout_secs: u64,
    /// Minimum delay between two requests to the source (CRAWL_DELAY_MS)
    pub crawl_delay_ms: u64,
    /// Background update period; 0 disables the updater (AUTO_UPDATE_INTERVAL_SECS)
    pub auto_update_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "lottery.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            source_base_url: std::env::var("SOURCE_BASE_URL")
                .unwrap_or_else(|_| SOURCE_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            source_user_agent: std::env::var("SOURCE_USER_AGENT")
                .unwrap_or_else(|_| SOURCE_USER_AGENT.to_string()),
            source_timeout_secs: std::env::var("SOURCE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse::<u64>()
                .unwrap_or(15),
            crawl_delay_ms: std::env::var("CRAWL_DELAY_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse::<u64>()
                .unwrap_or(500),
            auto_update_interval_secs: std::env::var("AUTO_UPDATE_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse::<u64>()
                .unwrap_or(3600),
        })
    }
}
