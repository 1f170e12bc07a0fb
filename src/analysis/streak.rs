use std::collections::BTreeMap;

use crate::analysis::classifier::{ClassificationMode, Rule};
use crate::config::MIN_STREAK_LEN;
use crate::types::{AnalysisRow, EmptyStreakStat, StreakCount, TrackedField};

/// Counts maximal runs of positions where `hit` holds.
///
/// `None` entries (no value that day) always break a run. Runs shorter than
/// `MIN_STREAK_LEN` are dropped, a run reaching the end of the sequence is
/// counted like any other. Output is ascending by run length.
pub fn compute_streaks<I, P>(codes: I, hit: P) -> Vec<StreakCount>
where
    I: IntoIterator<Item = Option<u8>>,
    P: Fn(u8) -> bool,
{
    let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
    let mut run = 0usize;

    for code in codes {
        if code.is_some_and(&hit) {
            run += 1;
        } else {
            record_run(&mut histogram, run);
            run = 0;
        }
    }
    record_run(&mut histogram, run);

    histogram
        .into_iter()
        .map(|(length, count)| StreakCount { length, count })
        .collect()
}

fn record_run(histogram: &mut BTreeMap<usize, usize>, run: usize) {
    if run >= MIN_STREAK_LEN {
        *histogram.entry(run).or_insert(0) += 1;
    }
}

/// Streak histograms for every field the mode can classify.
///
/// Binary modes produce one histogram per field (hit = code 1). Divide-by-3
/// produces three per field, one per remainder. Range fields without both
/// bounds are left out.
pub fn empty_streak_stats(rows: &[AnalysisRow], mode: &ClassificationMode) -> Vec<EmptyStreakStat> {
    let mut stats = Vec::new();

    for field in TrackedField::ALL {
        let Some(rule) = mode.rule(field) else {
            continue;
        };
        let codes = || rows.iter().map(move |r| r.streak_code(field));

        match rule {
            Rule::Mod3 => {
                for remainder in 0..3u8 {
                    stats.push(EmptyStreakStat {
                        field,
                        range: format!("mod 3 = {remainder}"),
                        counts: compute_streaks(codes(), |c| c == remainder),
                    });
                }
            }
            _ => stats.push(EmptyStreakStat {
                field,
                range: describe(&rule),
                counts: compute_streaks(codes(), |c| c == 1),
            }),
        }
    }

    stats
}

fn describe(rule: &Rule) -> String {
    match rule {
        Rule::Within { start, end } => format!("{start}-{end}"),
        Rule::Odd => "odd".to_string(),
        Rule::Prime => "prime".to_string(),
        Rule::Mod3 => "mod 3".to_string(),
    }
}
