use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::models::{AppearanceRow, DrawRow, PrizeDigitRow};
use crate::error::Result;
use crate::stats::cold_hot::AppearanceHistory;
use crate::types::{DrawRecord, PrizeDigit};

/// SQLite-backed store of draw records. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DrawStore {
    pool: SqlitePool,
}

impl DrawStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database file and applies migrations.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database ready at {db_path}");
        Ok(Self::new(pool))
    }

    pub async fn exists_by_date(&self, date: NaiveDate) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM draw_results WHERE draw_date = ?")
                .bind(date)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Writes a draw and all of its digits atomically. Returns false, writing
    /// nothing, when a record for that date already exists.
    pub async fn insert_record(&self, record: &DrawRecord) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO draw_results (draw_date, region, special_prize_raw)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(record.date)
        .bind(&record.region)
        .bind(&record.special_prize_raw)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        let draw_id = inserted.last_insert_rowid();

        for digit in &record.digits {
            sqlx::query(
                r#"
                INSERT INTO prize_digits (draw_id, prize_name, full_number, value)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(draw_id)
            .bind(digit.tier.as_str())
            .bind(&digit.full_number)
            .bind(digit.last_two.map(i64::from))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn find_by_date(&self, date: NaiveDate) -> Result<Option<DrawRecord>> {
        let Some(draw) = sqlx::query_as::<_, DrawRow>(
            "SELECT id, draw_date, region, special_prize_raw FROM draw_results WHERE draw_date = ?",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let digits = sqlx::query_as::<_, PrizeDigitRow>(
            "SELECT draw_id, prize_name, full_number, value FROM prize_digits WHERE draw_id = ? ORDER BY id",
        )
        .bind(draw.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(assemble(draw, digits.into_iter().filter_map(known_digit).collect())))
    }

    /// All records dated on or after `from`, ascending by date.
    pub async fn find_records_from(&self, from: NaiveDate) -> Result<Vec<DrawRecord>> {
        let draws = sqlx::query_as::<_, DrawRow>(
            r#"
            SELECT id, draw_date, region, special_prize_raw
            FROM draw_results
            WHERE draw_date >= ?
            ORDER BY draw_date
            "#,
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        let digit_rows = sqlx::query_as::<_, PrizeDigitRow>(
            r#"
            SELECT d.draw_id, d.prize_name, d.full_number, d.value
            FROM prize_digits d
            JOIN draw_results r ON r.id = d.draw_id
            WHERE r.draw_date >= ?
            ORDER BY d.id
            "#,
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        let mut by_draw: HashMap<i64, Vec<PrizeDigit>> = HashMap::new();
        for row in digit_rows {
            let draw_id = row.draw_id;
            if let Some(digit) = known_digit(row) {
                by_draw.entry(draw_id).or_default().push(digit);
            }
        }

        Ok(draws
            .into_iter()
            .map(|draw| {
                let digits = by_draw.remove(&draw.id).unwrap_or_default();
                assemble(draw, digits)
            })
            .collect())
    }

    pub async fn latest_draw_date(&self) -> Result<Option<NaiveDate>> {
        let latest: Option<NaiveDate> = sqlx::query_scalar(
            "SELECT draw_date FROM draw_results ORDER BY draw_date DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(latest)
    }

    pub async fn count_draws(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM draw_results")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Snapshot of every (number, day) appearance, for the cold/hot rankings.
    pub async fn load_appearances(&self) -> Result<AppearanceHistory> {
        let rows = sqlx::query_as::<_, AppearanceRow>(
            r#"
            SELECT DISTINCT d.value, r.draw_date
            FROM prize_digits d
            JOIN draw_results r ON r.id = d.draw_id
            WHERE d.value IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| u8::try_from(r.value).ok().map(|v| (v, r.draw_date)))
            .collect())
    }
}

fn known_digit(row: PrizeDigitRow) -> Option<PrizeDigit> {
    let name = row.prize_name.clone();
    let digit = row.into_digit();
    if digit.is_none() {
        warn!("Skipping digit with unknown prize name {name:?}");
    }
    digit
}

fn assemble(draw: DrawRow, digits: Vec<PrizeDigit>) -> DrawRecord {
    DrawRecord {
        date: draw.draw_date,
        region: draw.region,
        special_prize_raw: draw.special_prize_raw,
        digits,
    }
}

/// Single-connection in-memory store with the schema applied.
#[cfg(test)]
pub(crate) async fn memory_store() -> DrawStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    DrawStore::new(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrizeTier;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    fn record(day: u32, special: &str, others: &[(PrizeTier, &str)]) -> DrawRecord {
        let mut digits = vec![PrizeDigit::from_raw(PrizeTier::Special, special)];
        digits.extend(others.iter().map(|(t, s)| PrizeDigit::from_raw(*t, s)));
        DrawRecord {
            date: d(day),
            region: "MB".to_string(),
            special_prize_raw: Some(special.to_string()),
            digits,
        }
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let store = memory_store().await;
        let rec = record(3, "52668", &[(PrizeTier::First, "19307"), (PrizeTier::Second, "1")]);

        assert!(store.insert_record(&rec).await.unwrap());
        assert!(store.exists_by_date(d(3)).await.unwrap());
        assert_eq!(store.find_by_date(d(3)).await.unwrap(), Some(rec));
        assert_eq!(store.find_by_date(d(4)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_date_is_rejected_whole() {
        let store = memory_store().await;
        assert!(store.insert_record(&record(3, "11111", &[])).await.unwrap());
        let again = record(3, "22222", &[(PrizeTier::First, "33333")]);
        assert!(!store.insert_record(&again).await.unwrap());

        let stored = store.find_by_date(d(3)).await.unwrap().unwrap();
        assert_eq!(stored.special_prize_raw.as_deref(), Some("11111"));
        assert_eq!(stored.digits.len(), 1);
        assert_eq!(store.count_draws().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn records_from_date_are_ascending() {
        let store = memory_store().await;
        for day in [9, 2, 5, 7] {
            store
                .insert_record(&record(day, &format!("1000{day}"), &[(PrizeTier::First, "12345")]))
                .await
                .unwrap();
        }

        let records = store.find_records_from(d(5)).await.unwrap();
        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(5), d(7), d(9)]);
        assert!(records.iter().all(|r| r.digits.len() == 2));
        assert_eq!(store.latest_draw_date().await.unwrap(), Some(d(9)));
    }

    #[tokio::test]
    async fn empty_store_has_no_latest_date() {
        let store = memory_store().await;
        assert_eq!(store.latest_draw_date().await.unwrap(), None);
        assert_eq!(store.count_draws().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn appearances_are_distinct_per_day() {
        let store = memory_store().await;
        store
            .insert_record(&record(1, "10045", &[(PrizeTier::Third, "99945"), (PrizeTier::Fourth, "1212")]))
            .await
            .unwrap();
        store
            .insert_record(&record(2, "20045", &[]))
            .await
            .unwrap();

        let history = store.load_appearances().await.unwrap();
        assert_eq!(history.count_appearances(45, d(1), d(2)), 2);
        assert_eq!(history.count_appearances(12, d(1), d(2)), 1);
        assert_eq!(history.last_appearance(45), Some(d(2)));
        assert_eq!(history.known_numbers().collect::<Vec<_>>(), vec![12, 45]);
    }
}
