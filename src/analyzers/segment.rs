//! Collapses grouped rows into totals, shares, filtered subsets and
//! path-based content groups.

use crate::analyzers::utility::{mean, ratio};
use crate::record::{MetricSet, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Group name for paths no rule matches.
pub const OTHER_GROUP: &str = "other";

/// Sums the coerced `metric` across all successful rows.
pub fn total_of(set: &MetricSet, metric: &str) -> i64 {
    set.rows().map(|r| r.int(metric)).sum()
}

/// Float variant of [`total_of`] for fractional metrics.
pub fn total_of_f64(set: &MetricSet, metric: &str) -> f64 {
    set.rows().map(|r| r.float(metric)).sum()
}

/// Fraction of `total` contributed by `row`, `0.0` when `total` is not positive.
pub fn share_of(row: &Row, metric: &str, total: f64) -> f64 {
    ratio(row.float(metric), total)
}

/// Ordering applied to a filtered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder<'a> {
    /// Keep the incoming order.
    Preserve,
    Descending(&'a str),
    Ascending(&'a str),
}

/// Returns the rows of `set` in the given order. Ties keep their incoming order.
pub fn sorted(set: &MetricSet, order: SortOrder<'_>) -> MetricSet {
    let mut rows: Vec<Row> = set.rows().cloned().collect();
    match order {
        SortOrder::Preserve => {}
        SortOrder::Descending(metric) => {
            rows.sort_by(|a, b| b.float(metric).total_cmp(&a.float(metric)));
        }
        SortOrder::Ascending(metric) => {
            rows.sort_by(|a, b| a.float(metric).total_cmp(&b.float(metric)));
        }
    }
    MetricSet::from_rows(rows)
}

/// Rows whose `metric` exceeds `threshold` and whose `sample_metric` exceeds
/// `min_sample`.
///
/// The sample guard keeps a page with one visit and a 100% bounce rate from
/// being flagged.
pub fn filter_above(
    set: &MetricSet,
    metric: &str,
    threshold: f64,
    sample_metric: &str,
    min_sample: f64,
    order: SortOrder<'_>,
) -> MetricSet {
    let matching =
        set.filter(|r| r.float(metric) > threshold && r.float(sample_metric) > min_sample);
    sorted(&matching, order)
}

/// `true` when successful rows are in non-increasing order of `metric`.
pub fn is_sorted_desc(set: &MetricSet, metric: &str) -> bool {
    set.rows()
        .zip(set.rows().skip(1))
        .all(|(a, b)| a.float(metric) >= b.float(metric))
}

/// The highest-ranked row by `metric`.
///
/// Requires `set` sorted descending by `metric`, so the answer is the first
/// row. Unsorted input is logged and the largest row is used instead.
pub fn top_row<'a>(set: &'a MetricSet, metric: &str) -> Option<&'a Row> {
    let first = set.first_row()?;
    if is_sorted_desc(set, metric) {
        return Some(first);
    }

    warn!(metric, "Rows not sorted descending, selecting largest row as top");
    Some(set.rows().fold(first, |best, row| {
        if row.float(metric) > best.float(metric) {
            row
        } else {
            best
        }
    }))
}

/// Value of `metric` on the [`top_row`].
pub fn top_of(set: &MetricSet, metric: &str) -> Option<i64> {
    top_row(set, metric).map(|r| r.int(metric))
}

/// How a content rule matches a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMatch {
    Prefix(String),
    Exact(String),
}

impl PathMatch {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatch::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathMatch::Exact(exact) => path == exact,
        }
    }
}

/// One ordered classification rule, e.g. `{"prefix": "/agents", "group": "agents"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRule {
    #[serde(flatten)]
    pub matcher: PathMatch,
    pub group: String,
}

impl ContentRule {
    pub fn prefix(prefix: &str, group: &str) -> Self {
        Self {
            matcher: PathMatch::Prefix(prefix.to_string()),
            group: group.to_string(),
        }
    }

    pub fn exact(path: &str, group: &str) -> Self {
        Self {
            matcher: PathMatch::Exact(path.to_string()),
            group: group.to_string(),
        }
    }
}

/// Section rules used when the configuration does not provide any.
pub fn default_content_rules() -> Vec<ContentRule> {
    vec![
        ContentRule::prefix("/agents", "agents"),
        ContentRule::prefix("/problems", "problems"),
        ContentRule::prefix("/problem/", "problems"),
        ContentRule::prefix("/ideas", "ideas"),
        ContentRule::prefix("/idea/", "ideas"),
        ContentRule::prefix("/questions", "questions"),
        ContentRule::exact("/feed", "feed"),
        ContentRule::exact("/login", "auth"),
        ContentRule::exact("/join", "auth"),
        ContentRule::prefix("/auth", "auth"),
        ContentRule::prefix("/settings", "settings"),
        ContentRule::prefix("/api", "api"),
        ContentRule::exact("/", "home"),
    ]
}

/// Group of the first rule matching `path`, or [`OTHER_GROUP`].
pub fn classify<'a>(path: &str, rules: &'a [ContentRule]) -> &'a str {
    rules
        .iter()
        .find(|rule| rule.matcher.matches(path))
        .map_or(OTHER_GROUP, |rule| rule.group.as_str())
}

/// Per-group sums and means produced by [`group_aggregate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub rows: usize,
    pub sums: BTreeMap<String, i64>,
    pub means: BTreeMap<String, f64>,
}

/// Buckets rows by `classify_fn`, summing `sum_metrics` and averaging
/// `mean_metrics`.
///
/// Sums clamp each row at zero. Means are the plain mean of per-row values,
/// not weighted by traffic, so low-volume rows count as much as busy ones.
pub fn group_aggregate<F>(
    set: &MetricSet,
    classify_fn: F,
    sum_metrics: &[&str],
    mean_metrics: &[&str],
) -> BTreeMap<String, GroupAggregate>
where
    F: Fn(&Row) -> String,
{
    let mut samples: BTreeMap<String, (GroupAggregate, BTreeMap<&str, Vec<f64>>)> =
        BTreeMap::new();

    for row in set.rows() {
        let (aggregate, series) = samples.entry(classify_fn(row)).or_default();
        aggregate.rows += 1;
        for metric in sum_metrics {
            *aggregate.sums.entry(metric.to_string()).or_default() += row.int(metric).max(0);
        }
        for &metric in mean_metrics {
            series.entry(metric).or_default().push(row.float(metric));
        }
    }

    samples
        .into_iter()
        .map(|(group, (mut aggregate, series))| {
            for (metric, values) in series {
                aggregate.means.insert(metric.to_string(), mean(&values));
            }
            (group, aggregate)
        })
        .collect()
}

/// Site section summary over all pages classified into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentGroup {
    pub views: i64,
    pub users: i64,
    pub pages: usize,
    pub avg_engagement: f64,
    pub avg_bounce: f64,
}

/// Classifies `pages` by `pagePath` with `rules` and summarises each section.
pub fn content_groups(pages: &MetricSet, rules: &[ContentRule]) -> BTreeMap<String, ContentGroup> {
    let groups = group_aggregate(
        pages,
        |row| classify(row.dimension("pagePath").unwrap_or(""), rules).to_string(),
        &["screenPageViews", "totalUsers"],
        &["engagementRate", "bounceRate"],
    );

    groups
        .into_iter()
        .map(|(name, agg)| {
            let sum = |m: &str| agg.sums.get(m).copied().unwrap_or(0);
            let avg = |m: &str| agg.means.get(m).copied().unwrap_or(0.0);
            let group = ContentGroup {
                views: sum("screenPageViews"),
                users: sum("totalUsers"),
                pages: agg.rows,
                avg_engagement: avg("engagementRate"),
                avg_bounce: avg("bounceRate"),
            };
            (name, group)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(path: &str, views: &str, users: &str, engagement: &str, bounce: &str) -> Row {
        Row::new()
            .with_dimension("pagePath", path)
            .with_metric("screenPageViews", views)
            .with_metric("totalUsers", users)
            .with_metric("engagementRate", engagement)
            .with_metric("bounceRate", bounce)
    }

    fn sessions(values: &[&str]) -> MetricSet {
        values
            .iter()
            .map(|v| Row::new().with_metric("sessions", v))
            .collect()
    }

    #[test]
    fn test_total_and_share_skip_errors() {
        let set = sessions(&["60", "40", "oops"]);
        assert_eq!(total_of(&set, "sessions"), 100);
        assert_eq!(total_of(&MetricSet::failed("boom"), "sessions"), 0);

        let first = set.first_row().unwrap();
        assert_eq!(share_of(first, "sessions", 100.0), 0.6);
        assert_eq!(share_of(first, "sessions", 0.0), 0.0);
    }

    #[test]
    fn test_filter_above_requires_sample_size() {
        let pages = MetricSet::from_rows(vec![
            page("/a", "50", "40", "0.2", "0.7"),
            page("/b", "1", "1", "0.0", "1.0"),
            page("/c", "10", "9", "0.1", "0.9"),
            page("/d", "80", "70", "0.5", "0.3"),
        ]);

        let flagged = filter_above(
            &pages,
            "bounceRate",
            0.6,
            "screenPageViews",
            3.0,
            SortOrder::Descending("bounceRate"),
        );

        let paths: Vec<_> = flagged.rows().filter_map(|r| r.dimension("pagePath")).collect();
        assert_eq!(paths, vec!["/c", "/a"]);
    }

    #[test]
    fn test_top_row_uses_first_when_sorted() {
        let set = sessions(&["50", "50", "10"]);
        assert_eq!(top_of(&set, "sessions"), Some(50));
        assert!(is_sorted_desc(&set, "sessions"));
    }

    #[test]
    fn test_top_row_recovers_from_unsorted_input() {
        let set = sessions(&["10", "70", "20"]);
        assert!(!is_sorted_desc(&set, "sessions"));
        assert_eq!(top_of(&set, "sessions"), Some(70));
        assert_eq!(top_of(&MetricSet::default(), "sessions"), None);
    }

    #[test]
    fn test_classify_first_match_wins_and_falls_back() {
        let rules = default_content_rules();
        assert_eq!(classify("/agents/42", &rules), "agents");
        assert_eq!(classify("/problem/7", &rules), "problems");
        assert_eq!(classify("/problems", &rules), "problems");
        assert_eq!(classify("/feed", &rules), "feed");
        assert_eq!(classify("/feed/extra", &rules), OTHER_GROUP);
        assert_eq!(classify("/login", &rules), "auth");
        assert_eq!(classify("/", &rules), "home");
        assert_eq!(classify("/pricing", &rules), OTHER_GROUP);
        assert_eq!(classify("", &rules), OTHER_GROUP);
        assert_eq!(classify("/anything", &[]), OTHER_GROUP);

        let overlapping = vec![
            ContentRule::prefix("/a", "first"),
            ContentRule::prefix("/ab", "second"),
        ];
        assert_eq!(classify("/abc", &overlapping), "first");
    }

    #[test]
    fn test_group_aggregate_sums_and_unweighted_means() {
        let pages = MetricSet::from_rows(vec![
            page("/agents/1", "100", "80", "0.9", "0.1"),
            page("/agents/2", "2", "2", "0.1", "0.9"),
            page("/pricing", "10", "-5", "0.5", "0.5"),
        ]);

        let groups = content_groups(&pages, &default_content_rules());

        let agents = &groups["agents"];
        assert_eq!(agents.views, 102);
        assert_eq!(agents.users, 82);
        assert_eq!(agents.pages, 2);
        // Mean of per-page rates, not weighted by views.
        assert!((agents.avg_engagement - 0.5).abs() < 1e-9);
        assert!((agents.avg_bounce - 0.5).abs() < 1e-9);

        let other = &groups[OTHER_GROUP];
        assert_eq!(other.users, 0);
        assert_eq!(other.views, 10);
    }

    #[test]
    fn test_content_rule_json_shape() {
        let rules: Vec<ContentRule> = serde_json::from_str(
            r#"[{"prefix": "/docs", "group": "docs"}, {"exact": "/", "group": "home"}]"#,
        )
        .unwrap();
        assert_eq!(rules[0], ContentRule::prefix("/docs", "docs"));
        assert_eq!(rules[1], ContentRule::exact("/", "home"));
    }
}
