//! Query windows and period-over-period comparison.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::warn;

use crate::record::Row;
use crate::services::report_api::{ReportFetcher, fetch_totals};

/// Longest report window accepted on the command line.
pub const MAX_DAYS: u32 = 3650;

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// An inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `[today - days, today]`. Bounds that would fall before the earliest
    /// representable date saturate to it.
    pub fn current(today: NaiveDate, days: u32) -> Self {
        Self::new(days_before(today, days as u64), today)
    }

    /// The equal-length window ending the day before [`Period::current`]
    /// starts: `[today - 2*days - 1, today - days - 1]`. Saturates like
    /// [`Period::current`].
    pub fn previous(today: NaiveDate, days: u32) -> Self {
        let days = days as u64;
        Self::new(
            days_before(today, 2 * days + 1),
            days_before(today, days + 1),
        )
    }

    /// Number of calendar days covered, both bounds included.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Percentage view of a [`Delta`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Change {
    /// Both periods are zero.
    Unchanged,
    /// Previous is zero, current is not.
    New,
    Percent(f64),
}

/// Absolute and relative change of one metric between two periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub current: f64,
    pub previous: f64,
    pub change: f64,
    pub pct: Change,
}

impl Delta {
    pub fn new(current: f64, previous: f64) -> Self {
        let pct = if previous == 0.0 {
            if current == 0.0 {
                Change::Unchanged
            } else {
                Change::New
            }
        } else {
            Change::Percent((current - previous) / previous.abs() * 100.0)
        };

        Self {
            current,
            previous,
            change: current - previous,
            pct,
        }
    }

    /// Numeric percentage, substituting `new_value` for [`Change::New`] and
    /// `0.0` for [`Change::Unchanged`].
    pub fn pct_or(&self, new_value: f64) -> f64 {
        match self.pct {
            Change::Percent(p) => p,
            Change::New => new_value,
            Change::Unchanged => 0.0,
        }
    }

    /// Whether the movement is good news. `None` when nothing moved.
    pub fn is_improvement(&self, lower_is_better: bool) -> Option<bool> {
        if self.change == 0.0 {
            return None;
        }
        Some((self.change > 0.0) != lower_is_better)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricDelta {
    pub metric: String,
    pub delta: Delta,
}

/// Totals for a metric list over the current and previous windows.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodComparison {
    pub current_period: Period,
    pub previous_period: Period,
    pub deltas: Vec<MetricDelta>,
    pub current_error: Option<String>,
    pub previous_error: Option<String>,
}

impl PeriodComparison {
    pub fn get(&self, metric: &str) -> Option<&Delta> {
        self.deltas
            .iter()
            .find(|d| d.metric == metric)
            .map(|d| &d.delta)
    }

    /// Current-period value, `0.0` when the metric was not requested.
    pub fn current(&self, metric: &str) -> f64 {
        self.get(metric).map_or(0.0, |d| d.current)
    }

    pub fn previous(&self, metric: &str) -> f64 {
        self.get(metric).map_or(0.0, |d| d.previous)
    }

    /// `true` when the current window could not be fetched.
    pub fn current_missing(&self) -> bool {
        self.current_error.is_some()
    }
}

/// Fetches `metrics` totals for both windows and computes per-metric deltas.
///
/// The two fetches run concurrently. A failed window counts as all-zero and
/// its diagnostic is kept on the result.
#[tracing::instrument(skip(fetcher, metrics), fields(metric_count = metrics.len()))]
pub async fn compare_periods<F>(
    fetcher: &F,
    metrics: &[&str],
    days: u32,
    today: NaiveDate,
) -> PeriodComparison
where
    F: ReportFetcher + ?Sized,
{
    let current_period = Period::current(today, days);
    let previous_period = Period::previous(today, days);

    let (current, previous) = tokio::join!(
        fetch_totals(fetcher, metrics, current_period),
        fetch_totals(fetcher, metrics, previous_period),
    );

    let current_error = current.error().map(str::to_string);
    let previous_error = previous.error().map(str::to_string);
    if let Some(error) = &current_error {
        warn!(%error, "Current period totals unavailable");
    }
    if let Some(error) = &previous_error {
        warn!(%error, "Previous period totals unavailable");
    }

    let empty = Row::new();
    let current_row = current.first_row().unwrap_or(&empty);
    let previous_row = previous.first_row().unwrap_or(&empty);

    let deltas = metrics
        .iter()
        .map(|metric| MetricDelta {
            metric: metric.to_string(),
            delta: Delta::new(current_row.float(metric), previous_row.float(metric)),
        })
        .collect();

    PeriodComparison {
        current_period,
        previous_period,
        deltas,
        current_error,
        previous_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MetricSet;
    use crate::services::report_api::ReportRequest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_periods_abut_and_match_length() {
        let today = date(2024, 3, 31);
        let current = Period::current(today, 30);
        let previous = Period::previous(today, 30);

        assert_eq!(current, Period::new(date(2024, 3, 1), today));
        assert_eq!(previous, Period::new(date(2024, 1, 30), date(2024, 2, 29)));
        assert_eq!(current.len_days(), previous.len_days());
        assert_eq!(previous.end + Days::new(1), current.start);
    }

    #[test]
    fn test_huge_window_saturates_instead_of_panicking() {
        let today = date(2024, 3, 31);
        let current = Period::current(today, u32::MAX);
        let previous = Period::previous(today, u32::MAX);

        assert_eq!(current, Period::new(NaiveDate::MIN, today));
        assert_eq!(previous.start, NaiveDate::MIN);
        assert!(previous.end < today);
    }

    #[test]
    fn test_delta_cases() {
        assert_eq!(Delta::new(0.0, 0.0).pct, Change::Unchanged);
        assert_eq!(Delta::new(10.0, 0.0).pct, Change::New);
        assert_eq!(Delta::new(150.0, 100.0).pct, Change::Percent(50.0));
        assert_eq!(Delta::new(50.0, 100.0).pct, Change::Percent(-50.0));
        assert_eq!(Delta::new(50.0, 100.0).change, -50.0);
    }

    #[test]
    fn test_delta_pct_or_and_improvement() {
        assert_eq!(Delta::new(5.0, 0.0).pct_or(100.0), 100.0);
        assert_eq!(Delta::new(0.0, 0.0).pct_or(100.0), 0.0);
        assert_eq!(Delta::new(0.4, 0.5).is_improvement(true), Some(true));
        assert_eq!(Delta::new(0.4, 0.5).is_improvement(false), Some(false));
        assert_eq!(Delta::new(3.0, 3.0).is_improvement(false), None);
    }

    struct ByPeriod {
        current_start: NaiveDate,
    }

    #[async_trait::async_trait]
    impl ReportFetcher for ByPeriod {
        async fn query(&self, request: &ReportRequest) -> MetricSet {
            if request.period.start == self.current_start {
                MetricSet::from_rows(vec![
                    Row::new()
                        .with_metric("sessions", "150")
                        .with_metric("bounceRate", "0.4"),
                ])
            } else {
                MetricSet::failed("quota exhausted")
            }
        }

        async fn active_users_now(&self) -> i64 {
            0
        }
    }

    #[tokio::test]
    async fn test_compare_periods_zeroes_failed_window() {
        let today = date(2024, 3, 31);
        let fetcher = ByPeriod {
            current_start: Period::current(today, 30).start,
        };

        let cmp = compare_periods(&fetcher, &["sessions", "bounceRate"], 30, today).await;

        assert_eq!(cmp.current("sessions"), 150.0);
        assert_eq!(cmp.previous("sessions"), 0.0);
        assert_eq!(cmp.get("sessions").unwrap().pct, Change::New);
        assert_eq!(cmp.previous_error.as_deref(), Some("quota exhausted"));
        assert!(cmp.current_error.is_none());
        assert_eq!(cmp.deltas[0].metric, "sessions");
        assert_eq!(cmp.deltas[1].metric, "bounceRate");
    }
}
