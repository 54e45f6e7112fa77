//! JSON parser for GA4 Data API report responses.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::coerce::to_int;
use crate::record::{MetricSet, Row};

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Value {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    #[serde(default)]
    dimension_values: Vec<Value>,
    #[serde(default)]
    metric_values: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    #[serde(default)]
    dimension_headers: Vec<Header>,
    #[serde(default)]
    metric_headers: Vec<Header>,
    /// Omitted by the API when the report is empty.
    #[serde(default)]
    rows: Vec<ReportRow>,
}

/// Decodes a `runReport` response into rows keyed by header name.
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON report object.
pub fn parse_report(bytes: &[u8]) -> Result<MetricSet> {
    let response: ReportResponse =
        serde_json::from_slice(bytes).context("Malformed report response")?;

    let rows = response
        .rows
        .iter()
        .map(|row| {
            let with_dims = response
                .dimension_headers
                .iter()
                .zip(&row.dimension_values)
                .fold(Row::new(), |acc, (h, v)| acc.with_dimension(&h.name, &v.value));
            response
                .metric_headers
                .iter()
                .zip(&row.metric_values)
                .fold(with_dims, |acc, (h, v)| acc.with_metric(&h.name, &v.value))
        })
        .collect();

    Ok(MetricSet::from_rows(rows))
}

/// Reads the first metric of the first row of a `runRealtimeReport`
/// response, `0` when there are no rows.
pub fn parse_realtime(bytes: &[u8]) -> Result<i64> {
    let response: ReportResponse =
        serde_json::from_slice(bytes).context("Malformed realtime response")?;
    Ok(response
        .rows
        .first()
        .and_then(|row| row.metric_values.first())
        .map_or(0, |v| to_int(Some(&v.value))))
}
