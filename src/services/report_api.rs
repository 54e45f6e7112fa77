//! Trait and types for querying an analytics reporting service.

use crate::period::Period;
use crate::record::{MetricSet, Row};

/// The reporting API rejects requests with more metrics than this.
pub const MAX_METRICS_PER_QUERY: usize = 10;

/// One tabular query: dimensions × metrics over a period.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub period: Period,
    pub limit: u32,
    /// Metric to sort by. `None` keeps the service's natural order.
    pub order_by: Option<String>,
    pub descending: bool,
}

impl ReportRequest {
    pub fn new(dimensions: &[&str], metrics: &[&str], period: Period) -> Self {
        Self {
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            metrics: metrics.iter().map(|m| m.to_string()).collect(),
            period,
            limit: 100,
            order_by: None,
            descending: true,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Sorts descending by `metric`.
    pub fn order_by(mut self, metric: &str) -> Self {
        self.order_by = Some(metric.to_string());
        self
    }

    pub fn ascending(mut self) -> Self {
        self.descending = false;
        self
    }
}

/// Abstraction over an analytics reporting backend (e.g., GA4).
///
/// Implementations never fail: any problem (transport, auth, quota, unknown
/// dimension, timeout) comes back as an error-only [`MetricSet`].
#[async_trait::async_trait]
pub trait ReportFetcher: Send + Sync {
    async fn query(&self, request: &ReportRequest) -> MetricSet;

    /// Users active right now, `0` on failure.
    async fn active_users_now(&self) -> i64;
}

/// Fetches dimensionless totals for `metrics` as a single-row set.
///
/// Metric lists longer than [`MAX_METRICS_PER_QUERY`] are split into several
/// queries whose rows are merged. If any chunk fails the whole result fails.
pub async fn fetch_totals<F>(fetcher: &F, metrics: &[&str], period: Period) -> MetricSet
where
    F: ReportFetcher + ?Sized,
{
    let mut merged: Option<Row> = None;

    for chunk in metrics.chunks(MAX_METRICS_PER_QUERY) {
        let request = ReportRequest::new(&[], chunk, period).limit(1);
        let set = fetcher.query(&request).await;

        if set.is_failed() {
            return set;
        }

        let Some(row) = set.first_row() else {
            continue;
        };
        match merged {
            Some(ref mut acc) => acc.merge_metrics(row),
            None => merged = Some(row.clone()),
        }
    }

    MetricSet::from_rows(merged.into_iter().collect())
}
