use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use crate::fetch::{HttpClient, post_json};
use crate::parser::{parse_realtime, parse_report};
use crate::period::Period;
use crate::record::MetricSet;
use crate::services::report_api::{ReportFetcher, ReportRequest};

/// Dimension that switches a request to a cohort report.
const COHORT_DIMENSION: &str = "cohort";

fn date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Weekly acquisition cohorts covering `period`, named by the Sunday each
/// week starts on.
pub fn cohort_spec(period: Period) -> Value {
    let offset = period.start.weekday().num_days_from_sunday();
    let mut start = period
        .start
        .checked_sub_days(Days::new(offset as u64))
        .unwrap_or(period.start);
    let mut cohorts = Vec::new();
    while start <= period.end {
        let Some(end) = start.checked_add_days(Days::new(6)) else {
            break;
        };
        cohorts.push(json!({
            "name": date(start),
            "dimension": "firstSessionDate",
            "dateRange": { "startDate": date(start), "endDate": date(end) },
        }));
        let Some(next) = end.succ_opt() else {
            break;
        };
        start = next;
    }

    json!({
        "cohorts": cohorts,
        "cohortsRange": {
            "granularity": "WEEKLY",
            "startOffset": 0,
            "endOffset": cohorts.len().saturating_sub(1),
        },
    })
}

/// `runReport` body for `request`.
pub fn report_body(request: &ReportRequest) -> Value {
    let names = |list: &[String]| -> Vec<Value> {
        list.iter().map(|name| json!({ "name": name })).collect()
    };

    let mut body = json!({
        "dimensions": names(&request.dimensions),
        "metrics": names(&request.metrics),
        "limit": request.limit,
    });

    if request.dimensions.iter().any(|d| d == COHORT_DIMENSION) {
        body["cohortSpec"] = cohort_spec(request.period);
    } else {
        body["dateRanges"] = json!([{
            "startDate": date(request.period.start),
            "endDate": date(request.period.end),
        }]);
    }

    if let Some(metric) = &request.order_by {
        body["orderBys"] = json!([{
            "metric": { "metricName": metric },
            "desc": request.descending,
        }]);
    }

    body
}

/// [`ReportFetcher`] backed by the GA4 Data API.
///
/// One instance serves every concurrent section query for a property.
pub struct Ga4Client<C> {
    http: C,
    base_url: String,
    property_id: String,
    timeout: Duration,
}

impl<C: HttpClient> Ga4Client<C> {
    pub fn new(http: C, base_url: &str, property_id: &str, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            property_id: property_id.to_string(),
            timeout,
        }
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/v1beta/properties/{}:{}",
            self.base_url, self.property_id, method
        )
    }

    async fn post(&self, method: &str, body: &Value) -> Result<Vec<u8>> {
        let url = self.url(method);
        match tokio::time::timeout(self.timeout, post_json(&self.http, &url, body)).await {
            Ok(result) => result,
            Err(_) => bail!("{method} timed out after {}s", self.timeout.as_secs()),
        }
    }
}

#[async_trait]
impl<C: HttpClient> ReportFetcher for Ga4Client<C> {
    #[tracing::instrument(
        skip(self, request),
        fields(property = %self.property_id, dimensions = ?request.dimensions)
    )]
    async fn query(&self, request: &ReportRequest) -> MetricSet {
        let body = report_body(request);
        let result = self
            .post("runReport", &body)
            .await
            .and_then(|bytes| parse_report(&bytes));

        match result {
            Ok(set) => {
                debug!(rows = set.len(), "Report fetched");
                set
            }
            Err(e) => {
                warn!(error = %e, metrics = ?request.metrics, "Report query failed");
                MetricSet::failed(format!("{e:#}"))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(property = %self.property_id))]
    async fn active_users_now(&self) -> i64 {
        let body = json!({ "metrics": [{ "name": "activeUsers" }] });
        let result = self
            .post("runRealtimeReport", &body)
            .await
            .and_then(|bytes| parse_realtime(&bytes));

        result.unwrap_or_else(|e| {
            warn!(error = %e, "Realtime query failed");
            0
        })
    }
}
