//! Rows returned by a single analytics query.
//!
//! A [`MetricSet`] is the ordered result of one query. Each entry is a
//! [`Record`]: either a successful [`Row`] or an [`ErrorRecord`] meaning the
//! whole query failed.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::coerce::{to_float, to_int};

/// One successful result row: dimension values and metric values, both kept
/// in the order the query requested them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    dimensions: Vec<(String, String)>,
    metrics: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dimension value.
    pub fn with_dimension(mut self, name: &str, value: &str) -> Self {
        self.dimensions.push((name.to_string(), value.to_string()));
        self
    }

    /// Adds a metric value in its raw textual form.
    pub fn with_metric(mut self, name: &str, value: &str) -> Self {
        self.metrics.push((name.to_string(), value.to_string()));
        self
    }

    pub fn dimension(&self, name: &str) -> Option<&str> {
        lookup(&self.dimensions, name)
    }

    pub fn metric(&self, name: &str) -> Option<&str> {
        lookup(&self.metrics, name)
    }

    /// Metric coerced to an integer, `0` when missing or malformed.
    pub fn int(&self, name: &str) -> i64 {
        to_int(self.metric(name))
    }

    /// Metric coerced to a float, `0.0` when missing or malformed.
    pub fn float(&self, name: &str) -> f64 {
        to_float(self.metric(name))
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dimensions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Appends the metrics of `other` that this row does not already carry.
    pub(crate) fn merge_metrics(&mut self, other: &Row) {
        for (name, value) in &other.metrics {
            if self.metric(name).is_none() {
                self.metrics.push((name.clone(), value.clone()));
            }
        }
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.dimensions.len() + self.metrics.len()))?;
        for (k, v) in self.dimensions.iter().chain(self.metrics.iter()) {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Sentinel record carrying the diagnostic of a failed query.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ErrorRecord {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Record {
    Row(Row),
    Error(ErrorRecord),
}

/// Ordered records of one query. Order reflects the requested sort and is
/// significant for "top N" truncation.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct MetricSet {
    records: Vec<Record>,
}

impl MetricSet {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            records: rows.into_iter().map(Record::Row).collect(),
        }
    }

    /// A set holding only an [`ErrorRecord`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            records: vec![Record::Error(ErrorRecord {
                error: message.into(),
            })],
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Successful rows, skipping error records.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.records.iter().filter_map(|r| match r {
            Record::Row(row) => Some(row),
            Record::Error(_) => None,
        })
    }

    /// The first error diagnostic, if the query failed.
    pub fn error(&self) -> Option<&str> {
        self.records.iter().find_map(|r| match r {
            Record::Error(e) => Some(e.error.as_str()),
            Record::Row(_) => None,
        })
    }

    pub fn is_failed(&self) -> bool {
        self.error().is_some()
    }

    /// `true` when there is no successful row (empty or all-error).
    pub fn is_empty(&self) -> bool {
        self.rows().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.rows().count()
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.rows().next()
    }

    /// The first `n` successful rows, in order.
    pub fn top(&self, n: usize) -> MetricSet {
        MetricSet::from_rows(self.rows().take(n).cloned().collect())
    }

    /// Successful rows matching `keep`, in order. Error records are dropped.
    pub fn filter<F>(&self, keep: F) -> MetricSet
    where
        F: Fn(&Row) -> bool,
    {
        MetricSet::from_rows(self.rows().filter(|r| keep(r)).cloned().collect())
    }
}

impl FromIterator<Row> for MetricSet {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        MetricSet::from_rows(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str, sessions: &str) -> Row {
        Row::new()
            .with_dimension("sessionDefaultChannelGroup", name)
            .with_metric("sessions", sessions)
    }

    #[test]
    fn test_row_accessors_coerce() {
        let row = channel("Direct", "12.0");
        assert_eq!(row.dimension("sessionDefaultChannelGroup"), Some("Direct"));
        assert_eq!(row.int("sessions"), 12);
        assert_eq!(row.float("sessions"), 12.0);
        assert_eq!(row.int("missing"), 0);
        assert_eq!(row.metric("missing"), None);
    }

    #[test]
    fn test_failed_set_has_no_rows() {
        let set = MetricSet::failed("quota exhausted");
        assert!(set.is_failed());
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert_eq!(set.error(), Some("quota exhausted"));
        assert!(set.first_row().is_none());
    }

    #[test]
    fn test_top_preserves_order() {
        let set = MetricSet::from_rows(vec![
            channel("Direct", "50"),
            channel("Organic Search", "30"),
            channel("Referral", "20"),
        ]);
        let top = set.top(2);
        let names: Vec<_> = top
            .rows()
            .filter_map(|r| r.dimension("sessionDefaultChannelGroup"))
            .collect();
        assert_eq!(names, vec!["Direct", "Organic Search"]);
    }

    #[test]
    fn test_serializes_as_flat_maps() {
        let set = MetricSet::from_rows(vec![channel("Direct", "5")]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"[{"sessionDefaultChannelGroup":"Direct","sessions":"5"}]"#);

        let failed = serde_json::to_string(&MetricSet::failed("boom")).unwrap();
        assert_eq!(failed, r#"[{"error":"boom"}]"#);
    }

    #[test]
    fn test_merge_metrics_keeps_existing_values() {
        let mut a = Row::new().with_metric("sessions", "10");
        let b = Row::new()
            .with_metric("sessions", "99")
            .with_metric("totalUsers", "4");
        a.merge_metrics(&b);
        assert_eq!(a.int("sessions"), 10);
        assert_eq!(a.int("totalUsers"), 4);
    }
}
