pub mod classifier;
pub mod streak;

pub use classifier::{classify, ClassificationMode, RangeBounds};
pub use streak::empty_streak_stats;

use crate::types::{AnalysisRow, DrawRecord, EmptyStreakStat};

/// Classified rows plus the streak histograms computed over all of them.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub rows: Vec<AnalysisRow>,
    pub stats: Vec<EmptyStreakStat>,
}

/// Runs the classifier over `records` (ascending by date) and then the
/// streak scan over the resulting code sequences.
pub fn analyze(records: &[DrawRecord], mode: &ClassificationMode) -> AnalysisReport {
    let rows: Vec<AnalysisRow> = records.iter().map(|r| classify(r, mode)).collect();
    let stats = empty_streak_stats(&rows, mode);
    AnalysisReport { rows, stats }
}
