use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};

use crate::config::{HOT_DEFAULT_WINDOW_DAYS, RANKING_TOP_N};
use crate::types::{ColdNumber, HotNumber};

/// Largest two-digit number tracked by the rankings.
pub const MAX_NUMBER: u8 = 99;

/// Which days each two-digit number came out on.
///
/// Built from a snapshot of the store at request time; all lookups are
/// in-memory and count a number at most once per draw date.
#[derive(Debug, Clone, Default)]
pub struct AppearanceHistory {
    by_number: BTreeMap<u8, BTreeSet<NaiveDate>>,
}

impl AppearanceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, number: u8, date: NaiveDate) {
        if number <= MAX_NUMBER {
            self.by_number.entry(number).or_default().insert(date);
        }
    }

    /// Most recent date the number came out, across all history.
    pub fn last_appearance(&self, number: u8) -> Option<NaiveDate> {
        self.by_number.get(&number)?.last().copied()
    }

    /// Distinct draw dates in `[from, to]` on which the number came out.
    pub fn count_appearances(&self, number: u8, from: NaiveDate, to: NaiveDate) -> u32 {
        if from > to {
            return 0;
        }
        self.by_number
            .get(&number)
            .map_or(0, |dates| dates.range(from..=to).count() as u32)
    }

    /// Every number that has come out at least once, ascending.
    pub fn known_numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.by_number.keys().copied()
    }
}

impl FromIterator<(u8, NaiveDate)> for AppearanceHistory {
    fn from_iter<T: IntoIterator<Item = (u8, NaiveDate)>>(iter: T) -> Self {
        let mut history = Self::new();
        for (number, date) in iter {
            history.record(number, date);
        }
        history
    }
}

/// Top cold numbers as of `as_of`, longest absence first.
///
/// Never-seen numbers are skipped. With `window_start`, a number that came out
/// anywhere in `[window_start, as_of]` is not cold at all (this includes a hit
/// on `window_start` itself); the others keep their pre-window age.
pub fn compute_cold(
    history: &AppearanceHistory,
    window_start: Option<NaiveDate>,
    as_of: NaiveDate,
) -> Vec<ColdNumber> {
    let mut cold: Vec<ColdNumber> = (0..=MAX_NUMBER)
        .filter_map(|number| {
            let last = history.last_appearance(number)?;
            if let Some(start) = window_start {
                if history.count_appearances(number, start, as_of) > 0 || last >= start {
                    return None;
                }
            }
            Some(ColdNumber {
                number,
                days_since_last: (as_of - last).num_days(),
                last_appearance: last,
            })
        })
        .collect();

    cold.sort_by(|a, b| b.days_since_last.cmp(&a.days_since_last));
    cold.truncate(RANKING_TOP_N);
    cold
}

/// Top hot numbers in `[start, end]`, most frequent first. Zero counts are
/// left out.
pub fn compute_hot(history: &AppearanceHistory, start: NaiveDate, end: NaiveDate) -> Vec<HotNumber> {
    let mut hot: Vec<HotNumber> = history
        .known_numbers()
        .filter_map(|number| {
            let frequency = history.count_appearances(number, start, end);
            (frequency > 0).then_some(HotNumber { number, frequency })
        })
        .collect();

    hot.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    hot.truncate(RANKING_TOP_N);
    hot
}

/// Hot window used when the caller names no month.
pub fn default_hot_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(HOT_DEFAULT_WINDOW_DAYS), today)
}
