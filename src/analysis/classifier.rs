use crate::types::{AnalysisRow, DrawRecord, TrackedField};

pub const TAG_RANGE: &str = "50-50";
pub const TAG_EVEN_ODD: &str = "even-odd";
pub const TAG_PRIME: &str = "prime";
pub const TAG_DIVIDE_THREE: &str = "divide-3";

/// Caller-supplied inclusive bounds for one field in range mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeBounds {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl RangeBounds {
    pub fn new(start: Option<i32>, end: Option<i32>) -> Self {
        Self { start, end }
    }

    /// Both ends, or nothing. A half-open filter is no filter.
    pub fn resolved(&self) -> Option<(i32, i32)> {
        self.start.zip(self.end)
    }
}

/// How each tracked value is turned into a match code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationMode {
    /// Bounds indexed by `TrackedField::index()`.
    Range([RangeBounds; 4]),
    EvenOdd,
    Prime,
    DivideThree,
}

/// The single-value rule a mode applies to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Within { start: i32, end: i32 },
    Odd,
    Prime,
    Mod3,
}

impl Rule {
    pub fn code(&self, value: u8) -> u8 {
        match *self {
            Rule::Within { start, end } => {
                let v = i32::from(value);
                u8::from(v >= start && v <= end)
            }
            Rule::Odd => value % 2,
            Rule::Prime => u8::from(is_prime(u32::from(value))),
            Rule::Mod3 => value % 3,
        }
    }
}

impl ClassificationMode {
    /// Resolves a wire tag. Bounds are only kept for range mode.
    pub fn from_tag(tag: &str, bounds: [RangeBounds; 4]) -> Option<Self> {
        match tag.trim() {
            TAG_RANGE => Some(ClassificationMode::Range(bounds)),
            TAG_EVEN_ODD => Some(ClassificationMode::EvenOdd),
            TAG_PRIME => Some(ClassificationMode::Prime),
            TAG_DIVIDE_THREE => Some(ClassificationMode::DivideThree),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn tag(&self) -> &'static str {
        match self {
            ClassificationMode::Range(_) => TAG_RANGE,
            ClassificationMode::EvenOdd => TAG_EVEN_ODD,
            ClassificationMode::Prime => TAG_PRIME,
            ClassificationMode::DivideThree => TAG_DIVIDE_THREE,
        }
    }

    /// None when range mode has no complete bounds for `field`.
    pub fn rule(&self, field: TrackedField) -> Option<Rule> {
        match self {
            ClassificationMode::Range(bounds) => bounds[field.index()]
                .resolved()
                .map(|(start, end)| Rule::Within { start, end }),
            ClassificationMode::EvenOdd => Some(Rule::Odd),
            ClassificationMode::Prime => Some(Rule::Prime),
            ClassificationMode::DivideThree => Some(Rule::Mod3),
        }
    }
}

/// Trial division up to the square root. 0 and 1 are not prime.
pub fn is_prime(n: u32) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Reads one tracked value from a record. Missing digits and malformed
/// strings both come back as None.
pub fn field_value(record: &DrawRecord, field: TrackedField) -> Option<u8> {
    let digit = record.first_digit(field.tier())?;
    if !field.is_leading() {
        return digit.last_two;
    }

    let full = if digit.full_number.is_empty() && field == TrackedField::DauDb {
        record.special_prize_raw.as_deref().unwrap_or("")
    } else {
        digit.full_number.as_str()
    };
    leading_two(full)
}

fn leading_two(s: &str) -> Option<u8> {
    let head = s.get(..2)?;
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    head.parse().ok()
}

/// Classifies one day under `mode`. Absent values always get code 0.
pub fn classify(record: &DrawRecord, mode: &ClassificationMode) -> AnalysisRow {
    let mut values = [None; 4];
    let mut codes = [0u8; 4];

    for field in TrackedField::ALL {
        let value = field_value(record, field);
        let code = match (value, mode.rule(field)) {
            (Some(v), Some(rule)) => rule.code(v),
            _ => 0,
        };
        values[field.index()] = value;
        codes[field.index()] = code;
    }

    AnalysisRow {
        date: record.date,
        values,
        codes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PrizeDigit, PrizeTier};
    use chrono::NaiveDate;
    use rstest::rstest;

    fn record(special: Option<&str>, first: Option<&str>) -> DrawRecord {
        let mut digits = Vec::new();
        if let Some(s) = special {
            digits.push(PrizeDigit::from_raw(PrizeTier::Special, s));
        }
        if let Some(s) = first {
            digits.push(PrizeDigit::from_raw(PrizeTier::First, s));
        }
        DrawRecord {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            region: "MB".to_string(),
            special_prize_raw: special.map(str::to_string),
            digits,
        }
    }

    fn bounds(start: i32, end: i32) -> RangeBounds {
        RangeBounds::new(Some(start), Some(end))
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, false)]
    #[case(4, false)]
    #[case(6, false)]
    #[case(8, false)]
    #[case(9, false)]
    #[case(10, false)]
    #[case(2, true)]
    #[case(3, true)]
    #[case(5, true)]
    #[case(7, true)]
    #[case(11, true)]
    #[case(97, true)]
    fn prime_codes(#[case] value: u8, #[case] prime: bool) {
        assert_eq!(Rule::Prime.code(value), u8::from(prime));
    }

    #[test]
    fn mod3_code_is_a_remainder() {
        assert_eq!(Rule::Mod3.code(0), 0);
        assert_eq!(Rule::Mod3.code(3), 0);
        for v in 0..=99u8 {
            assert!(Rule::Mod3.code(v) <= 2, "value {v}");
        }
    }

    #[test]
    fn odd_values_hit() {
        assert_eq!(Rule::Odd.code(7), 1);
        assert_eq!(Rule::Odd.code(42), 0);
    }

    #[test]
    fn range_is_inclusive() {
        let rule = Rule::Within { start: 36, end: 95 };
        assert_eq!(rule.code(36), 1);
        assert_eq!(rule.code(95), 1);
        assert_eq!(rule.code(35), 0);
        assert_eq!(rule.code(96), 0);
    }

    #[test]
    fn extracts_all_four_fields() {
        let rec = record(Some("52668"), Some("19307"));
        assert_eq!(field_value(&rec, TrackedField::DauDb), Some(52));
        assert_eq!(field_value(&rec, TrackedField::Db), Some(68));
        assert_eq!(field_value(&rec, TrackedField::DauG1), Some(19));
        assert_eq!(field_value(&rec, TrackedField::G1), Some(7));
    }

    #[test]
    fn leading_special_falls_back_to_raw_prize() {
        let mut rec = record(Some("52668"), None);
        rec.digits[0].full_number.clear();
        assert_eq!(field_value(&rec, TrackedField::DauDb), Some(52));
    }

    #[test]
    fn missing_prize_gives_no_value_and_zero_code() {
        let rec = record(Some("52668"), None);
        let row = classify(&rec, &ClassificationMode::EvenOdd);
        assert_eq!(row.value(TrackedField::DauG1), None);
        assert_eq!(row.value(TrackedField::G1), None);
        assert_eq!(row.code(TrackedField::G1), 0);
        assert_eq!(row.streak_code(TrackedField::G1), None);
    }

    #[test]
    fn short_or_malformed_numbers_are_absent() {
        let mut rec = record(Some("7"), Some("12345"));
        rec.special_prize_raw = Some("7".to_string());
        rec.digits[1].full_number = "1x345".to_string();

        let row = classify(&rec, &ClassificationMode::Prime);
        assert_eq!(row.value(TrackedField::DauDb), None);
        assert_eq!(row.code(TrackedField::DauDb), 0);
        assert_eq!(row.value(TrackedField::Db), Some(7));
        assert_eq!(row.code(TrackedField::Db), 1);
        assert_eq!(row.value(TrackedField::DauG1), None);
    }

    #[test]
    fn range_mode_without_bounds_never_hits() {
        let mut all = [RangeBounds::default(); 4];
        all[TrackedField::Db.index()] = bounds(60, 70);
        all[TrackedField::G1.index()] = RangeBounds::new(Some(0), None);
        let mode = ClassificationMode::Range(all);
        let row = classify(&record(Some("52668"), Some("19307")), &mode);

        assert_eq!(row.code(TrackedField::Db), 1);
        assert_eq!(row.code(TrackedField::DauDb), 0);
        assert_eq!(row.code(TrackedField::G1), 0);
        assert!(mode.rule(TrackedField::G1).is_none());
    }

    #[test]
    fn parses_wire_tags() {
        let none = [RangeBounds::default(); 4];
        assert_eq!(
            ClassificationMode::from_tag("divide-3", none),
            Some(ClassificationMode::DivideThree)
        );
        assert_eq!(ClassificationMode::from_tag("even-odd", none).map(|m| m.tag()), Some("even-odd"));
        assert!(matches!(
            ClassificationMode::from_tag("50-50", none),
            Some(ClassificationMode::Range(_))
        ));
        assert_eq!(ClassificationMode::from_tag("fibonacci", none), None);
    }
}
