//! Placeholder range forecasts and the recommendation that picks among them.
//!
//! The generators are not predictive. Each one draws a range start from a
//! seeded 48-bit LCG (same sequence as `java.util.Random`) so a given day
//! always yields the same ranges as the service has historically published.

use chrono::{Datelike, NaiveDate};

use crate::config::forecast_range;
use crate::stats::cold_hot::MAX_NUMBER;

const LCG_MULTIPLIER: u64 = 0x5_DEEC_E66D;
const LCG_INCREMENT: u64 = 0xB;
const LCG_MASK: u64 = (1 << 48) - 1;

const DAYS_FROM_CE_TO_UNIX_EPOCH: i64 = 719_163;

/// Confidence gained per number of range width above the minimum width.
const CONFIDENCE_SLOPE: f64 = 0.20 / 50.0;

/// Score penalty per number of range width when the width is free.
const WIDTH_PENALTY: f64 = 0.1 / 100.0;

// ---------------------------------------------------------------------------
// Seeded generator
// ---------------------------------------------------------------------------

/// 48-bit linear congruential generator with `java.util.Random` output.
#[derive(Debug, Clone)]
pub struct LegacyRng {
    state: u64,
}

impl LegacyRng {
    pub fn new(seed: i64) -> Self {
        Self {
            state: (seed as u64 ^ LCG_MULTIPLIER) & LCG_MASK,
        }
    }

    fn next_bits(&mut self, bits: u32) -> i32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT)
            & LCG_MASK;
        (self.state >> (48 - bits)) as u32 as i32
    }

    #[cfg(test)]
    pub fn next_i32(&mut self) -> i32 {
        self.next_bits(32)
    }

    /// Uniform in `[0, bound)`. `bound` must be positive.
    pub fn next_below(&mut self, bound: i32) -> i32 {
        debug_assert!(bound > 0);
        let m = bound - 1;
        let mut r = self.next_bits(31);
        if (bound & m) == 0 {
            return ((i64::from(bound) * i64::from(r)) >> 31) as i32;
        }
        let mut u = r;
        loop {
            r = u % bound;
            if u.wrapping_sub(r).wrapping_add(m) >= 0 {
                return r;
            }
            u = self.next_bits(31);
        }
    }
}

/// `String.hashCode` over UTF-16 code units.
pub fn legacy_string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Seed for one (day, algorithm label, width) combination. The label is
/// hashed as given, so an alias seeds differently from the full name.
pub fn forecast_seed(as_of: NaiveDate, label: &str, range_size: u32) -> i64 {
    epoch_day(as_of) + i64::from(legacy_string_hash(label)) + i64::from(range_size)
}

/// Days since 1970-01-01.
fn epoch_day(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - DAYS_FROM_CE_TO_UNIX_EPOCH
}

// ---------------------------------------------------------------------------
// Algorithms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForecastAlgorithm {
    FrequencyAnalysis,
    Lstm,
    MarkovChains,
}

impl ForecastAlgorithm {
    pub const ALL: [ForecastAlgorithm; 3] = [
        ForecastAlgorithm::FrequencyAnalysis,
        ForecastAlgorithm::Lstm,
        ForecastAlgorithm::MarkovChains,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ForecastAlgorithm::FrequencyAnalysis => "Frequency Analysis",
            ForecastAlgorithm::Lstm => "Long Short-Term Memory",
            ForecastAlgorithm::MarkovChains => "Markov Chains",
        }
    }

    /// Accepts the full names and the short aliases.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim() {
            "Frequency Analysis" => Some(ForecastAlgorithm::FrequencyAnalysis),
            "Long Short-Term Memory" | "LSTM" => Some(ForecastAlgorithm::Lstm),
            "Markov Chains" | "Markov" => Some(ForecastAlgorithm::MarkovChains),
            _ => None,
        }
    }

    /// (lowest start, number of possible starts)
    fn start_span(&self) -> (u32, i32) {
        match self {
            ForecastAlgorithm::FrequencyAnalysis => (60, 21),
            ForecastAlgorithm::Lstm => (55, 26),
            ForecastAlgorithm::MarkovChains => (50, 31),
        }
    }

    fn base_confidence(&self) -> f64 {
        match self {
            ForecastAlgorithm::FrequencyAnalysis => 0.60,
            ForecastAlgorithm::Lstm => 0.70,
            ForecastAlgorithm::MarkovChains => 0.65,
        }
    }

    /// Fixed linear function of the range width.
    pub fn confidence(&self, range_size: u32) -> f64 {
        self.base_confidence()
            + (f64::from(range_size) - f64::from(forecast_range::MIN)) * CONFIDENCE_SLOPE
    }

    /// Unclamped range start and confidence for one seed.
    pub fn forecast(&self, range_size: u32, seed: i64) -> (u32, f64) {
        let (low, span) = self.start_span();
        let start = low + LegacyRng::new(seed).next_below(span) as u32;
        (start, self.confidence(range_size))
    }
}

impl std::fmt::Display for ForecastAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Ranges and selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRange {
    pub algorithm: ForecastAlgorithm,
    pub range_size: u32,
    pub start: u32,
    pub end: u32,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub range: ForecastRange,
    pub reason: String,
}

/// Keeps `[start, start + size - 1]` inside 0..=99 by shifting it down.
pub fn clamp_range(start: u32, range_size: u32) -> (u32, u32) {
    let end = start + range_size.saturating_sub(1);
    if end > u32::from(MAX_NUMBER) {
        let end = u32::from(MAX_NUMBER);
        (end.saturating_sub(range_size.saturating_sub(1)), end)
    } else {
        (start, end)
    }
}

/// The width if it is inside the supported bounds.
pub fn valid_range_size(range_size: Option<u32>) -> Option<u32> {
    range_size.filter(|s| (forecast_range::MIN..=forecast_range::MAX).contains(s))
}

/// Every width the recommendation considers when the caller names none.
pub fn candidate_range_sizes() -> Vec<u32> {
    (forecast_range::MIN..=forecast_range::MAX)
        .step_by(forecast_range::STEP)
        .collect()
}

fn build_range(algorithm: ForecastAlgorithm, label: &str, range_size: u32, as_of: NaiveDate) -> ForecastRange {
    let (raw_start, confidence) = algorithm.forecast(range_size, forecast_seed(as_of, label, range_size));
    let (start, end) = clamp_range(raw_start, range_size);
    ForecastRange {
        algorithm,
        range_size,
        start,
        end,
        confidence,
    }
}

/// Best (algorithm, width) pair for `as_of`.
///
/// With a pinned width only confidence counts; otherwise wider ranges pay a
/// small penalty. Ties keep the earlier candidate.
pub fn select_best(
    algorithms: &[ForecastAlgorithm],
    range_sizes: &[u32],
    pinned: bool,
    as_of: NaiveDate,
) -> ForecastRange {
    let fallback_size = if pinned {
        range_sizes.first().copied().unwrap_or(forecast_range::DEFAULT)
    } else {
        forecast_range::DEFAULT
    };
    let mut best = ForecastRange {
        algorithm: ForecastAlgorithm::FrequencyAnalysis,
        range_size: fallback_size,
        start: 60,
        end: 80,
        confidence: ForecastAlgorithm::FrequencyAnalysis.confidence(fallback_size),
    };
    let mut best_score = 0.0;

    for &algorithm in algorithms {
        for &range_size in range_sizes {
            let candidate = build_range(algorithm, algorithm.name(), range_size, as_of);
            let score = if pinned {
                candidate.confidence
            } else {
                candidate.confidence - f64::from(range_size) * WIDTH_PENALTY
            };
            if score > best_score {
                best_score = score;
                best = candidate;
            }
        }
    }

    best
}

/// Recommendation over all algorithms, at the caller's width if valid.
pub fn recommend(user_range_size: Option<u32>, as_of: NaiveDate) -> Recommendation {
    let pinned = valid_range_size(user_range_size);
    let sizes = pinned.map_or_else(candidate_range_sizes, |s| vec![s]);
    let range = select_best(&ForecastAlgorithm::ALL, &sizes, pinned.is_some(), as_of);

    let percent = range.confidence * 100.0;
    let reason = if pinned.is_some() {
        format!(
            "With a {} number range, {} gives the highest confidence ({percent:.0}%)",
            range.range_size, range.algorithm
        )
    } else {
        format!(
            "Across all combinations, {} with a {} number range gives the highest confidence ({percent:.0}%)",
            range.algorithm, range.range_size
        )
    };

    Recommendation { range, reason }
}

/// Forecast for the algorithm label the caller sent and their width,
/// defaulting to Frequency Analysis over 20 numbers.
///
/// Unknown labels run the Frequency Analysis generator. The label itself
/// seeds the generator, and the recommendation is reused only when the label
/// is exactly its algorithm's full name.
pub fn quick_forecast(
    label: Option<&str>,
    range_size: Option<u32>,
    recommendation: &Recommendation,
    as_of: NaiveDate,
) -> ForecastRange {
    let label = label.unwrap_or(ForecastAlgorithm::FrequencyAnalysis.name());
    let algorithm = ForecastAlgorithm::parse(label).unwrap_or(ForecastAlgorithm::FrequencyAnalysis);
    let range_size = valid_range_size(range_size).unwrap_or(forecast_range::DEFAULT);

    let rec = &recommendation.range;
    if label == rec.algorithm.name() && rec.range_size == range_size {
        return rec.clone();
    }
    build_range(algorithm, label, range_size, as_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 11).unwrap()
    }

    #[test]
    fn generator_matches_legacy_sequence() {
        assert_eq!(LegacyRng::new(0).next_i32(), -1_155_484_576);
    }

    #[test]
    fn epoch_day_counts_from_1970() {
        assert_eq!(epoch_day(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0);
        assert_eq!(epoch_day(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
        assert_eq!(epoch_day(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()), 10_957);
    }

    #[test]
    fn string_hash_matches_legacy() {
        assert_eq!(legacy_string_hash(""), 0);
        assert_eq!(legacy_string_hash("hello"), 99_162_322);
    }

    #[test]
    fn bounded_draws_stay_in_bounds() {
        for seed in -500..500i64 {
            let mut rng = LegacyRng::new(seed * 7919);
            for bound in [1, 2, 16, 21, 26, 31, 100] {
                let v = rng.next_below(bound);
                assert!((0..bound).contains(&v), "seed {seed} bound {bound} -> {v}");
            }
        }
    }

    #[test]
    fn starts_fall_in_algorithm_spans() {
        for seed in 0..200i64 {
            let (f, _) = ForecastAlgorithm::FrequencyAnalysis.forecast(20, seed);
            let (l, _) = ForecastAlgorithm::Lstm.forecast(20, seed);
            let (m, _) = ForecastAlgorithm::MarkovChains.forecast(20, seed);
            assert!((60..=80).contains(&f));
            assert!((55..=80).contains(&l));
            assert!((50..=80).contains(&m));
        }
    }

    #[test]
    fn confidence_is_linear_in_width() {
        let lstm = ForecastAlgorithm::Lstm;
        assert!((lstm.confidence(10) - 0.70).abs() < 1e-9);
        assert!((lstm.confidence(60) - 0.90).abs() < 1e-9);
        assert!((ForecastAlgorithm::MarkovChains.confidence(35) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn clamp_shifts_range_down() {
        assert_eq!(clamp_range(90, 20), (80, 99));
        assert_eq!(clamp_range(60, 20), (60, 79));
        assert_eq!(clamp_range(80, 20), (80, 99));
    }

    #[test]
    fn aliases_parse() {
        assert_eq!(ForecastAlgorithm::parse("LSTM"), Some(ForecastAlgorithm::Lstm));
        assert_eq!(ForecastAlgorithm::parse("Markov"), Some(ForecastAlgorithm::MarkovChains));
        assert_eq!(
            ForecastAlgorithm::parse("Frequency Analysis"),
            Some(ForecastAlgorithm::FrequencyAnalysis)
        );
        assert_eq!(ForecastAlgorithm::parse("Random Forest"), None);
    }

    #[test]
    fn recommendation_is_stable_for_a_day() {
        assert_eq!(recommend(None, day()), recommend(None, day()));
        assert_eq!(recommend(Some(30), day()), recommend(Some(30), day()));
    }

    #[test]
    fn free_width_prefers_best_confidence_net_of_penalty() {
        let rec = recommend(None, day());
        assert_eq!(rec.range.algorithm, ForecastAlgorithm::Lstm);
        assert_eq!(rec.range.range_size, 60);
        assert!(rec.range.end <= 99);
        assert_eq!(rec.range.end - rec.range.start + 1, 60);
    }

    #[test]
    fn pinned_width_is_kept() {
        let rec = recommend(Some(25), day());
        assert_eq!(rec.range.range_size, 25);
        assert_eq!(rec.range.algorithm, ForecastAlgorithm::Lstm);
    }

    #[test]
    fn out_of_bounds_width_is_ignored() {
        assert_eq!(valid_range_size(Some(5)), None);
        assert_eq!(valid_range_size(Some(61)), None);
        assert_eq!(recommend(Some(75), day()), recommend(None, day()));
    }

    #[test]
    fn quick_forecast_defaults_and_reuse() {
        let rec = recommend(None, day());
        let quick = quick_forecast(None, Some(3), &rec, day());
        assert_eq!(quick.algorithm, ForecastAlgorithm::FrequencyAnalysis);
        assert_eq!(quick.range_size, 20);
        assert!(quick.end <= 99);

        let same = quick_forecast(Some(rec.range.algorithm.name()), Some(rec.range.range_size), &rec, day());
        assert_eq!(same, rec.range);
    }

    #[test]
    fn alias_seeds_with_its_own_label() {
        let rec = recommend(Some(10), day());
        assert_ne!(
            forecast_seed(day(), "LSTM", 30),
            forecast_seed(day(), "Long Short-Term Memory", 30)
        );

        let short = quick_forecast(Some("LSTM"), Some(30), &rec, day());
        let (start, _) = ForecastAlgorithm::Lstm.forecast(30, forecast_seed(day(), "LSTM", 30));
        assert_eq!(short.algorithm, ForecastAlgorithm::Lstm);
        assert_eq!((short.start, short.end), clamp_range(start, 30));
        assert!((short.confidence - ForecastAlgorithm::Lstm.confidence(30)).abs() < 1e-9);

        let unknown = quick_forecast(Some("Oracle"), Some(20), &rec, day());
        let (start, _) = ForecastAlgorithm::FrequencyAnalysis.forecast(20, forecast_seed(day(), "Oracle", 20));
        assert_eq!(unknown.algorithm, ForecastAlgorithm::FrequencyAnalysis);
        assert_eq!(unknown.start, clamp_range(start, 20).0);
    }

    #[test]
    fn alias_never_reuses_the_recommendation() {
        let rec = recommend(Some(25), day());
        assert_eq!(rec.range.algorithm, ForecastAlgorithm::Lstm);
        let by_alias = quick_forecast(Some("LSTM"), Some(25), &rec, day());
        let expected = build_range(ForecastAlgorithm::Lstm, "LSTM", 25, day());
        assert_eq!(by_alias, expected);
    }

    #[test]
    fn candidate_widths_step_by_five() {
        let sizes = candidate_range_sizes();
        assert_eq!(sizes.first(), Some(&10));
        assert_eq!(sizes.last(), Some(&60));
        assert_eq!(sizes.len(), 11);
    }
}
