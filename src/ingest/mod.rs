pub mod crawler;
pub mod source;
pub mod updater;

pub use crawler::{AutoUpdate, CrawlOutcome, CrawlSummary, Crawler};
pub use source::MinhNgocSource;
pub use updater::AutoUpdater;
