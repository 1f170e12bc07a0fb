use chrono::{Datelike, Months, NaiveDate};

use crate::db::DrawStore;
use crate::error::{AppError, Result};
use crate::stats::cold_hot::{compute_cold, compute_hot, default_hot_window, AppearanceHistory};
use crate::stats::forecast::{quick_forecast, recommend, ForecastRange, Recommendation};
use crate::types::{ColdNumber, HotNumber};

/// Filters for one dashboard request. Months are stored as their first day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardQuery {
    pub cold_month: Option<NaiveDate>,
    pub hot_month: Option<NaiveDate>,
    /// Algorithm label as the caller sent it, trimmed.
    pub algorithm: Option<String>,
    pub range_size: Option<u32>,
}

impl DashboardQuery {
    /// Builds the query from raw `yyyy-MM` strings. `month` wins over both
    /// per-list months. A width that does not fit a `u32` is treated as
    /// absent.
    pub fn from_params(
        month: Option<&str>,
        cold_month: Option<&str>,
        hot_month: Option<&str>,
        algorithm: Option<&str>,
        range_size: Option<i64>,
    ) -> Result<Self> {
        let month = non_blank(month).map(parse_month).transpose()?;
        let (cold_month, hot_month) = match month {
            Some(m) => (Some(m), Some(m)),
            None => (
                non_blank(cold_month).map(parse_month).transpose()?,
                non_blank(hot_month).map(parse_month).transpose()?,
            ),
        };
        Ok(Self {
            cold_month,
            hot_month,
            algorithm: non_blank(algorithm).map(str::to_owned),
            range_size: range_size.and_then(|v| u32::try_from(v).ok()),
        })
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// First day of a `yyyy-MM` month.
pub fn parse_month(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid month {s:?}, expected yyyy-MM")))
}

/// Last day of the month containing `day`.
pub fn month_end(day: NaiveDate) -> NaiveDate {
    let first = day.with_day(1).unwrap_or(day);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(day)
}

/// Hot window for a month, cut off at `today`.
pub fn month_window(month_start: NaiveDate, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (month_start, month_end(month_start).min(today))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_days: i64,
    pub last_update: Option<NaiveDate>,
    pub cold: Vec<ColdNumber>,
    pub hot: Vec<HotNumber>,
    pub forecast: ForecastRange,
    pub recommendation: Recommendation,
}

/// Everything on the dashboard, from an already-loaded history.
pub fn assemble(
    history: &AppearanceHistory,
    total_days: i64,
    last_update: Option<NaiveDate>,
    query: &DashboardQuery,
    today: NaiveDate,
) -> DashboardStats {
    let cold = compute_cold(history, query.cold_month, today);
    let (hot_start, hot_end) = query
        .hot_month
        .map_or_else(|| default_hot_window(today), |m| month_window(m, today));
    let hot = compute_hot(history, hot_start, hot_end);

    let recommendation = recommend(query.range_size, today);
    let forecast = quick_forecast(query.algorithm.as_deref(), query.range_size, &recommendation, today);

    DashboardStats {
        total_days,
        last_update,
        cold,
        hot,
        forecast,
        recommendation,
    }
}

pub async fn load_dashboard(store: &DrawStore, query: &DashboardQuery, today: NaiveDate) -> Result<DashboardStats> {
    let total_days = store.count_draws().await?;
    let last_update = store.latest_draw_date().await?;
    let history = store.load_appearances().await?;
    Ok(assemble(&history, total_days, last_update, query, today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::memory_store;
    use crate::stats::forecast::ForecastAlgorithm;
    use crate::types::{DrawRecord, PrizeDigit, PrizeTier};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_bounds() {
        assert_eq!(parse_month("2024-02").unwrap(), d(2024, 2, 1));
        assert_eq!(month_end(d(2024, 2, 10)), d(2024, 2, 29));
        assert_eq!(month_end(d(2025, 12, 31)), d(2025, 12, 31));
        assert!(matches!(parse_month("2024/02"), Err(AppError::BadRequest(_))));
        assert!(parse_month("2024-13").is_err());
    }

    #[test]
    fn current_month_window_stops_today() {
        assert_eq!(month_window(d(2025, 6, 1), d(2025, 6, 12)), (d(2025, 6, 1), d(2025, 6, 12)));
        assert_eq!(month_window(d(2025, 5, 1), d(2025, 6, 12)), (d(2025, 5, 1), d(2025, 5, 31)));
    }

    #[test]
    fn month_overrides_list_months() {
        let q = DashboardQuery::from_params(Some("2025-03"), Some("2025-01"), Some("2025-02"), None, None).unwrap();
        assert_eq!(q.cold_month, Some(d(2025, 3, 1)));
        assert_eq!(q.hot_month, Some(d(2025, 3, 1)));

        let q = DashboardQuery::from_params(Some(" "), Some("2025-01"), None, Some("Markov"), Some(30)).unwrap();
        assert_eq!(q.cold_month, Some(d(2025, 1, 1)));
        assert_eq!(q.hot_month, None);
        assert_eq!(q.algorithm.as_deref(), Some("Markov"));
        assert_eq!(q.range_size, Some(30));
    }

    #[test]
    fn unrepresentable_width_is_dropped() {
        for raw in [-5, 99_999_999_999] {
            let q = DashboardQuery::from_params(None, None, None, None, Some(raw)).unwrap();
            assert_eq!(q.range_size, None);
            let stats = assemble(&AppearanceHistory::new(), 0, None, &q, d(2025, 6, 1));
            assert_eq!(stats.forecast.range_size, 20);
        }
    }

    #[test]
    fn alias_label_is_kept_verbatim() {
        let q = DashboardQuery::from_params(None, None, None, Some(" LSTM "), Some(30)).unwrap();
        assert_eq!(q.algorithm.as_deref(), Some("LSTM"));
        let today = d(2025, 6, 1);
        let stats = assemble(&AppearanceHistory::new(), 0, None, &q, today);
        assert_eq!(stats.forecast.algorithm, ForecastAlgorithm::Lstm);
        assert_eq!(
            stats.forecast,
            quick_forecast(Some("LSTM"), Some(30), &stats.recommendation, today)
        );
    }

    #[test]
    fn unknown_algorithm_uses_default() {
        let q = DashboardQuery::from_params(None, None, None, Some("Oracle"), None).unwrap();
        assert_eq!(q.algorithm.as_deref(), Some("Oracle"));
        let stats = assemble(&AppearanceHistory::new(), 0, None, &q, d(2025, 6, 1));
        assert_eq!(stats.forecast.algorithm, ForecastAlgorithm::FrequencyAnalysis);
        assert_eq!(stats.forecast.range_size, 20);
    }

    #[test]
    fn hot_month_limits_the_window() {
        let history: AppearanceHistory = [
            (11, d(2025, 5, 3)),
            (11, d(2025, 5, 20)),
            (22, d(2025, 6, 2)),
        ]
        .into_iter()
        .collect();
        let query = DashboardQuery {
            hot_month: Some(d(2025, 5, 1)),
            ..Default::default()
        };

        let stats = assemble(&history, 3, Some(d(2025, 6, 2)), &query, d(2025, 6, 5));
        assert_eq!(stats.hot, vec![HotNumber { number: 11, frequency: 2 }]);
        assert_eq!(stats.cold.len(), 2);
        assert_eq!(stats.cold[0].number, 11);
    }

    #[tokio::test]
    async fn loads_from_store() {
        let store = memory_store().await;
        for (day, special) in [(1, "12345"), (2, "67845")] {
            let record = DrawRecord {
                date: d(2025, 6, day),
                region: "MB".to_string(),
                special_prize_raw: Some(special.to_string()),
                digits: vec![PrizeDigit::from_raw(PrizeTier::Special, special)],
            };
            store.insert_record(&record).await.unwrap();
        }

        let stats = load_dashboard(&store, &DashboardQuery::default(), d(2025, 6, 10))
            .await
            .unwrap();
        assert_eq!(stats.total_days, 2);
        assert_eq!(stats.last_update, Some(d(2025, 6, 2)));
        assert_eq!(stats.hot, vec![HotNumber { number: 45, frequency: 2 }]);
        assert_eq!(stats.cold[0].days_since_last, 8);
    }
}
