//! Weekly acquisition cohort retention.

use crate::analyzers::utility::ratio;
use crate::record::MetricSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tracing::debug;

/// Column names a cohort query reports its values under.
#[derive(Debug, Clone, Copy)]
pub struct CohortColumns<'a> {
    pub cohort: &'a str,
    pub week: &'a str,
    pub active: &'a str,
    pub total: &'a str,
}

impl Default for CohortColumns<'_> {
    fn default() -> Self {
        Self {
            cohort: "cohort",
            week: "cohortNthWeek",
            active: "cohortActiveUsers",
            total: "cohortTotalUsers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CohortCell {
    pub active: i64,
    pub total: i64,
    pub retention: f64,
}

impl CohortCell {
    pub fn new(active: i64, total: i64) -> Self {
        Self {
            active,
            total,
            retention: ratio(active as f64, total as f64),
        }
    }
}

/// Retention by cohort and week offset. Absent cells are distinct from zero
/// retention.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CohortMatrix {
    cohorts: BTreeMap<String, BTreeMap<u32, CohortCell>>,
}

fn parse_week(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

impl CohortMatrix {
    /// Builds from `(cohort, week, active, total)` tuples. Later duplicates
    /// replace earlier ones.
    pub fn from_tuples<'a, I>(tuples: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, i64, i64)>,
    {
        let mut matrix = Self::default();
        for (cohort, week, active, total) in tuples {
            matrix.insert(cohort, week, active, total);
        }
        matrix
    }

    /// Builds from cohort query rows using the default column names.
    pub fn from_set(set: &MetricSet) -> Self {
        Self::from_set_with(set, CohortColumns::default())
    }

    pub fn from_set_with(set: &MetricSet, columns: CohortColumns<'_>) -> Self {
        let mut matrix = Self::default();
        for row in set.rows() {
            let cohort = row.dimension(columns.cohort).unwrap_or("");
            let week = row.dimension(columns.week).unwrap_or("");
            matrix.insert(cohort, week, row.int(columns.active), row.int(columns.total));
        }
        matrix
    }

    fn insert(&mut self, cohort: &str, week: &str, active: i64, total: i64) {
        let Some(offset) = parse_week(week) else {
            debug!(cohort, week, "Skipping cohort row with unparseable week offset");
            return;
        };
        if cohort.is_empty() {
            debug!(week, "Skipping cohort row without cohort id");
            return;
        }
        self.cohorts
            .entry(cohort.to_string())
            .or_default()
            .insert(offset, CohortCell::new(active, total));
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    pub fn cell(&self, cohort: &str, week: u32) -> Option<&CohortCell> {
        self.cohorts.get(cohort)?.get(&week)
    }

    pub fn retention(&self, cohort: &str, week: u32) -> Option<f64> {
        self.cell(cohort, week).map(|c| c.retention)
    }

    /// Retention for each week in `weeks`, `None` where the cell is absent.
    pub fn window(&self, cohort: &str, weeks: RangeInclusive<u32>) -> Vec<Option<f64>> {
        weeks.map(|w| self.retention(cohort, w)).collect()
    }

    /// Cohort ids in ascending order.
    pub fn cohorts(&self) -> impl Iterator<Item = &str> {
        self.cohorts.keys().map(String::as_str)
    }

    /// The `n` newest cohort ids, newest first.
    pub fn recent(&self, n: usize) -> Vec<&str> {
        self.cohorts.keys().rev().take(n).map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Row;

    fn cohort_row(cohort: &str, week: &str, active: &str, total: &str) -> Row {
        Row::new()
            .with_dimension("cohort", cohort)
            .with_dimension("cohortNthWeek", week)
            .with_metric("cohortActiveUsers", active)
            .with_metric("cohortTotalUsers", total)
    }

    #[test]
    fn test_retention_distinguishes_absent_from_zero() {
        let matrix = CohortMatrix::from_tuples([
            ("2024-W1", "0", 80, 100),
            ("2024-W1", "1", 40, 100),
            ("2024-W2", "0", 0, 80),
        ]);

        assert_eq!(matrix.retention("2024-W1", 0), Some(0.8));
        assert_eq!(matrix.retention("2024-W1", 1), Some(0.4));
        assert_eq!(matrix.retention("2024-W1", 2), None);
        assert_eq!(matrix.retention("2024-W2", 0), Some(0.0));
        assert_eq!(matrix.retention("2024-W9", 0), None);
    }

    #[test]
    fn test_zero_total_is_zero_retention() {
        let matrix = CohortMatrix::from_tuples([("c", "0", 5, 0)]);
        assert_eq!(matrix.retention("c", 0), Some(0.0));
    }

    #[test]
    fn test_from_set_parses_padded_weeks_and_skips_bad_rows() {
        let set = MetricSet::from_rows(vec![
            cohort_row("cohort_0", "0000", "40", "40"),
            cohort_row("cohort_0", "0001", "10", "40"),
            cohort_row("cohort_0", "week-two", "5", "40"),
            cohort_row("", "0000", "9", "9"),
        ]);
        let matrix = CohortMatrix::from_set(&set);

        assert_eq!(matrix.cohorts().collect::<Vec<_>>(), vec!["cohort_0"]);
        assert_eq!(matrix.retention("cohort_0", 1), Some(0.25));
        assert_eq!(
            matrix.window("cohort_0", 0..=4),
            vec![Some(1.0), Some(0.25), None, None, None]
        );
    }

    #[test]
    fn test_recent_newest_first() {
        let matrix = CohortMatrix::from_tuples([
            ("cohort_0", "0", 1, 1),
            ("cohort_1", "0", 1, 1),
            ("cohort_2", "0", 1, 1),
        ]);
        assert_eq!(matrix.recent(2), vec!["cohort_2", "cohort_1"]);
        assert_eq!(matrix.recent(10).len(), 3);
        assert!(CohortMatrix::from_set(&MetricSet::failed("boom")).is_empty());
    }
}
