use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Prize tiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrizeTier {
    Special,
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Sixth,
    Seventh,
}

impl PrizeTier {
    pub const ALL: [PrizeTier; 8] = [
        PrizeTier::Special,
        PrizeTier::First,
        PrizeTier::Second,
        PrizeTier::Third,
        PrizeTier::Fourth,
        PrizeTier::Fifth,
        PrizeTier::Sixth,
        PrizeTier::Seventh,
    ];

    /// Name persisted in `prize_digits.prize_name`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrizeTier::Special => "Giai_DB",
            PrizeTier::First => "Giai_1",
            PrizeTier::Second => "Giai_2",
            PrizeTier::Third => "Giai_3",
            PrizeTier::Fourth => "Giai_4",
            PrizeTier::Fifth => "Giai_5",
            PrizeTier::Sixth => "Giai_6",
            PrizeTier::Seventh => "Giai_7",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for PrizeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Draw records
// ---------------------------------------------------------------------------

/// One number of a draw, tagged with its prize tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrizeDigit {
    pub tier: PrizeTier,
    /// Digits only; may be empty.
    pub full_number: String,
    /// Last two digits (0-99). None only when no digit could be parsed.
    pub last_two: Option<u8>,
}

impl PrizeDigit {
    /// Builds a digit from scraped text: keeps only ASCII digits and derives
    /// the two-digit value (a lone digit is taken as-is).
    pub fn from_raw(tier: PrizeTier, raw: &str) -> Self {
        let full_number: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let last_two = match full_number.len() {
            0 => None,
            1 => full_number.parse::<u8>().ok(),
            n => full_number[n - 2..].parse::<u8>().ok(),
        };
        Self {
            tier,
            full_number,
            last_two,
        }
    }
}

/// One day's published result. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    pub date: NaiveDate,
    pub region: String,
    pub special_prize_raw: Option<String>,
    pub digits: Vec<PrizeDigit>,
}

impl DrawRecord {
    /// First digit recorded for `tier`, in ingestion order.
    pub fn first_digit(&self, tier: PrizeTier) -> Option<&PrizeDigit> {
        self.digits.iter().find(|d| d.tier == tier)
    }

    pub fn digits_of(&self, tier: PrizeTier) -> impl Iterator<Item = &PrizeDigit> {
        self.digits.iter().filter(move |d| d.tier == tier)
    }
}

// ---------------------------------------------------------------------------
// Tracked fields
// ---------------------------------------------------------------------------

/// The four per-day values the analysis tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackedField {
    /// First two digits of the special prize.
    DauDb,
    /// Last two digits of the special prize.
    Db,
    /// First two digits of the first prize.
    DauG1,
    /// Last two digits of the first prize.
    G1,
}

impl TrackedField {
    pub const ALL: [TrackedField; 4] = [
        TrackedField::DauDb,
        TrackedField::Db,
        TrackedField::DauG1,
        TrackedField::G1,
    ];

    pub fn index(&self) -> usize {
        match self {
            TrackedField::DauDb => 0,
            TrackedField::Db => 1,
            TrackedField::DauG1 => 2,
            TrackedField::G1 => 3,
        }
    }

    /// Column label shown next to each streak histogram.
    pub fn label(&self) -> &'static str {
        match self {
            TrackedField::DauDb => "Đầu ĐB",
            TrackedField::Db => "ĐB",
            TrackedField::DauG1 => "Đầu G1",
            TrackedField::G1 => "G1",
        }
    }

    pub fn tier(&self) -> PrizeTier {
        match self {
            TrackedField::DauDb | TrackedField::Db => PrizeTier::Special,
            TrackedField::DauG1 | TrackedField::G1 => PrizeTier::First,
        }
    }

    /// "Dau" fields read the leading digits of the full number.
    pub fn is_leading(&self) -> bool {
        matches!(self, TrackedField::DauDb | TrackedField::DauG1)
    }
}

impl std::fmt::Display for TrackedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Derived statistics
// ---------------------------------------------------------------------------

/// A classified day: one value and one match code per tracked field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRow {
    pub date: NaiveDate,
    pub values: [Option<u8>; 4],
    pub codes: [u8; 4],
}

impl AnalysisRow {
    pub fn value(&self, field: TrackedField) -> Option<u8> {
        self.values[field.index()]
    }

    pub fn code(&self, field: TrackedField) -> u8 {
        self.codes[field.index()]
    }

    /// Code as seen by the streak scan: absent values break every run.
    pub fn streak_code(&self, field: TrackedField) -> Option<u8> {
        self.value(field).map(|_| self.code(field))
    }
}

/// One histogram bucket: `count` runs of exactly `length` days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakCount {
    #[serde(rename = "emptyLength")]
    pub length: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyStreakStat {
    pub field: TrackedField,
    pub range: String,
    /// Ascending by length; lengths are always >= MIN_STREAK_LEN.
    pub counts: Vec<StreakCount>,
}

/// A number that has not come out for a while.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColdNumber {
    pub number: u8,
    pub days_since_last: i64,
    pub last_appearance: NaiveDate,
}

/// A number that came out often within a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotNumber {
    pub number: u8,
    pub frequency: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_keeps_only_ascii_digits() {
        let d = PrizeDigit::from_raw(PrizeTier::Special, " 52-668 ");
        assert_eq!(d.full_number, "52668");
        assert_eq!(d.last_two, Some(68));
    }

    #[test]
    fn single_digit_is_its_own_value() {
        let d = PrizeDigit::from_raw(PrizeTier::Seventh, "7");
        assert_eq!(d.last_two, Some(7));
    }

    #[test]
    fn empty_digit_has_no_value() {
        let d = PrizeDigit::from_raw(PrizeTier::First, "SR");
        assert!(d.full_number.is_empty());
        assert_eq!(d.last_two, None);
    }

    #[test]
    fn leading_zero_is_preserved() {
        let d = PrizeDigit::from_raw(PrizeTier::Third, "0245");
        assert_eq!(d.full_number, "0245");
        assert_eq!(d.last_two, Some(45));
    }

    #[test]
    fn tier_names_round_trip() {
        for tier in PrizeTier::ALL {
            assert_eq!(PrizeTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(PrizeTier::parse("Giai_8"), None);
    }
}
