use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::ingest::crawler::{AutoUpdate, Crawler};

/// Periodically pulls any days published since the latest stored draw.
pub struct AutoUpdater {
    crawler: Arc<Crawler>,
    period: Duration,
}

impl AutoUpdater {
    pub fn new(crawler: Arc<Crawler>, period_secs: u64) -> Self {
        Self {
            crawler,
            period: Duration::from_secs(period_secs),
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.period);

        loop {
            // First tick fires immediately, so the store catches up at startup.
            ticker.tick().await;
            self.tick().await;
        }
    }

    async fn tick(&self) {
        let today = Local::now().date_naive();
        match self.crawler.auto_update(today).await {
            Ok(AutoUpdate::Crawled { from, to, summary }) => info!(
                %from,
                %to,
                saved = summary.saved,
                failed = summary.failed,
                "Auto-update complete",
            ),
            Ok(AutoUpdate::UpToDate) => debug!("Auto-update: already up to date"),
            Ok(AutoUpdate::Empty) => info!("Auto-update skipped: no draws stored yet, run a range crawl first"),
            Err(AppError::Busy(_)) => debug!("Auto-update skipped: another crawl is running"),
            Err(e) => error!("Auto-update failed: {e}"),
        }
    }
}
