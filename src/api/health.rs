//! Shared ingestion health for the /health endpoint.
//! Updated by the crawler, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default)]
pub struct HealthState {
    /// True while a crawl (single, range or auto-update) is running.
    crawl_running: AtomicBool,
    /// Millisecond timestamp of the last saved draw (0 = none).
    last_ingest_at_ms: AtomicU64,
    /// Draws saved since process start.
    records_saved: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the crawl slot. None if another crawl holds it. The guard owns
    /// a handle so it can move into a spawned task.
    pub fn try_begin_crawl(self: &Arc<Self>) -> Option<CrawlGuard> {
        self.crawl_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CrawlGuard {
                health: Arc::clone(self),
            })
    }

    pub fn record_saved(&self) {
        self.records_saved.fetch_add(1, Ordering::Relaxed);
        self.last_ingest_at_ms.store(now_ms(), Ordering::Relaxed);
    }

    pub fn crawl_running(&self) -> bool {
        self.crawl_running.load(Ordering::Acquire)
    }

    pub fn last_ingest_at_ms(&self) -> u64 {
        self.last_ingest_at_ms.load(Ordering::Relaxed)
    }

    pub fn records_saved(&self) -> u64 {
        self.records_saved.load(Ordering::Relaxed)
    }
}

/// Releases the crawl slot on drop.
#[derive(Debug)]
pub struct CrawlGuard {
    health: Arc<HealthState>,
}

impl Drop for CrawlGuard {
    fn drop(&mut self) {
        self.health.crawl_running.store(false, Ordering::Release);
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
