//! Row types for the `draw_results` / `prize_digits` schema in `migrations/`.

use chrono::NaiveDate;

use crate::types::{PrizeDigit, PrizeTier};

#[derive(Debug, sqlx::FromRow)]
pub struct DrawRow {
    pub id: i64,
    pub draw_date: NaiveDate,
    pub region: String,
    pub special_prize_raw: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct PrizeDigitRow {
    pub draw_id: i64,
    pub prize_name: String,
    pub full_number: String,
    pub value: Option<i64>,
}

impl PrizeDigitRow {
    /// None for prize names this build does not know.
    pub fn into_digit(self) -> Option<PrizeDigit> {
        Some(PrizeDigit {
            tier: PrizeTier::parse(&self.prize_name)?,
            full_number: self.full_number,
            last_two: self.value.and_then(|v| u8::try_from(v).ok()),
        })
    }
}

/// One (number, day) pair; distinct per day.
#[derive(Debug, sqlx::FromRow)]
pub struct AppearanceRow {
    pub value: i64,
    pub draw_date: NaiveDate,
}
