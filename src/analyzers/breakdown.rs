//! Domain-specific reductions over segment rows: country and visitor
//! segment quality, device mix, event filtering, page trends, scroll depth,
//! outbound links and organic search.

use crate::analyzers::segment::total_of;
use crate::analyzers::utility::ratio;
use crate::period::Delta;
use crate::record::{MetricSet, Row};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Placeholder the reporting API uses for a missing dimension value.
pub const NOT_SET: &str = "(not set)";

/// Events the analytics SDK records on its own.
pub const AUTO_EVENTS: &[&str] = &[
    "page_view",
    "scroll",
    "session_start",
    "first_visit",
    "user_engagement",
    "click",
    "file_download",
    "view_search_results",
];

/// Campaign names that mean "no campaign".
const UNTRACKED_CAMPAIGNS: &[&str] = &[NOT_SET, "(organic)", "(direct)", ""];

/// Scroll buckets counted as reading a page to the end.
const DEEP_SCROLL: &[&str] = &["90", "100"];

/// Audiences that cover every visitor.
const CATCH_ALL_AUDIENCES: &[&str] = &["All Users"];

/// Drops rows whose `dimension` is empty or [`NOT_SET`]. A failed set is
/// returned as is.
pub fn excluding_not_set(set: &MetricSet, dimension: &str) -> MetricSet {
    if set.is_failed() {
        return set.clone();
    }
    set.filter(|r| matches!(r.dimension(dimension), Some(v) if !v.is_empty() && v != NOT_SET))
}

/// Named audiences only: drops [`NOT_SET`] and catch-all audiences.
pub fn named_audiences(audiences: &MetricSet) -> MetricSet {
    excluding_not_set(audiences, "audienceName").filter(|r| {
        r.dimension("audienceName")
            .is_some_and(|name| !CATCH_ALL_AUDIENCES.contains(&name))
    })
}

/// `engagementRate*0.4 + min(pagesPerSession/5, 1)*0.3 + min(avgDuration/300, 1)*0.3`.
///
/// Lies in `[0, 1]` for engagement rates in `[0, 1]`.
pub fn segment_quality(row: &Row) -> f64 {
    let engagement = row.float("engagementRate").max(0.0);
    let depth = (row.float("screenPageViewsPerSession").max(0.0) / 5.0).min(1.0);
    let duration = (row.float("averageSessionDuration").max(0.0) / 300.0).min(1.0);
    engagement * 0.4 + depth * 0.3 + duration * 0.3
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentQuality {
    pub segment: String,
    pub sessions: i64,
    pub users: i64,
    pub engagement_rate: f64,
    pub bounce_rate: f64,
    pub quality: f64,
}

/// [`segment_quality`] of each row, labelled by `dimension`, in query order.
pub fn rate_segments(set: &MetricSet, dimension: &str) -> Vec<SegmentQuality> {
    set.rows()
        .map(|row| SegmentQuality {
            segment: row.dimension(dimension).unwrap_or(NOT_SET).to_string(),
            sessions: row.int("sessions"),
            users: row.int("totalUsers"),
            engagement_rate: row.float("engagementRate"),
            bounce_rate: row.float("bounceRate"),
            quality: segment_quality(row),
        })
        .collect()
}

/// Organic Google Search performance from a linked Search Console.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrganicSearch {
    /// `false` when the totals query failed, usually because no Search
    /// Console property is linked.
    pub available: bool,
    pub clicks: i64,
    pub impressions: i64,
    pub ctr: f64,
    pub avg_position: f64,
    pub error: Option<String>,
}

/// Reads Search Console totals.
pub fn organic_search(totals: &MetricSet) -> OrganicSearch {
    if let Some(error) = totals.error() {
        return OrganicSearch {
            error: Some(error.to_string()),
            ..OrganicSearch::default()
        };
    }
    let row = totals.first_row().cloned().unwrap_or_default();
    OrganicSearch {
        available: true,
        clicks: row.int("organicGoogleSearchClicks"),
        impressions: row.int("organicGoogleSearchImpressions"),
        ctr: row.float("organicGoogleSearchClickThroughRate"),
        avg_position: row.float("organicGoogleSearchAveragePosition"),
        error: None,
    }
}

/// `engagementRate * ln(max(sessions, 1) + 1) * min(avgDuration / 60, 5)`.
pub fn country_quality(row: &Row) -> f64 {
    let engagement = row.float("engagementRate");
    let sessions = row.int("sessions").max(1) as f64;
    let duration = row.float("averageSessionDuration");
    engagement * (sessions + 1.0).ln() * (duration / 60.0).min(5.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryQuality {
    pub country: String,
    pub sessions: i64,
    pub share: f64,
    pub engagement_rate: f64,
    pub quality: f64,
}

/// Countries ranked by [`country_quality`], best first.
pub fn rank_countries(countries: &MetricSet) -> Vec<CountryQuality> {
    let total = total_of(countries, "sessions") as f64;
    let mut ranked: Vec<CountryQuality> = countries
        .rows()
        .map(|row| CountryQuality {
            country: row.dimension("country").unwrap_or(NOT_SET).to_string(),
            sessions: row.int("sessions"),
            share: ratio(row.float("sessions"), total),
            engagement_rate: row.float("engagementRate"),
            quality: country_quality(row),
        })
        .collect();
    ranked.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    ranked
}

/// Events that are not in [`AUTO_EVENTS`].
pub fn custom_events(events: &MetricSet) -> MetricSet {
    events.filter(|r| {
        r.dimension("eventName")
            .is_some_and(|name| !AUTO_EVENTS.contains(&name))
    })
}

/// Mobile plus tablet share of device sessions.
///
/// `None` when there is no device data to judge.
pub fn mobile_share(devices: &MetricSet) -> Option<f64> {
    let total = total_of(devices, "sessions");
    if total <= 0 {
        return None;
    }
    let handheld: i64 = devices
        .rows()
        .filter(|r| matches!(r.dimension("deviceCategory"), Some("mobile" | "tablet")))
        .map(|r| r.int("sessions"))
        .sum();
    Some(handheld as f64 / total as f64)
}

/// Whether any first-touch row carries a real campaign name.
///
/// `None` when the query failed, so absence of data is not read as absence
/// of campaigns.
pub fn has_campaigns(first_touch: &MetricSet) -> Option<bool> {
    if first_touch.is_failed() {
        return None;
    }
    Some(first_touch.rows().any(|r| {
        r.dimension("firstUserCampaignName")
            .is_some_and(|name| !UNTRACKED_CAMPAIGNS.contains(&name))
    }))
}

/// Views of one page in two consecutive windows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageTrend {
    pub path: String,
    pub delta: Delta,
    /// Percentage change, `100` for pages new this window.
    pub trend_pct: f64,
}

/// Per-key change of `metric` between `current` and `previous` rows, keyed
/// by `dimension`. Keys only present in `previous` are ignored.
pub fn page_trends(
    current: &MetricSet,
    previous: &MetricSet,
    dimension: &str,
    metric: &str,
) -> Vec<PageTrend> {
    let before: HashMap<&str, f64> = previous
        .rows()
        .filter_map(|r| Some((r.dimension(dimension)?, r.float(metric))))
        .collect();

    current
        .rows()
        .filter_map(|row| {
            let path = row.dimension(dimension)?;
            let delta = Delta::new(row.float(metric), before.get(path).copied().unwrap_or(0.0));
            Some(PageTrend {
                path: path.to_string(),
                delta,
                trend_pct: delta.pct_or(100.0),
            })
        })
        .collect()
}

/// Up to `n` pages with the largest positive trend.
pub fn trending(trends: &[PageTrend], n: usize) -> Vec<PageTrend> {
    let mut up: Vec<PageTrend> = trends.iter().filter(|t| t.trend_pct > 0.0).cloned().collect();
    up.sort_by(|a, b| b.trend_pct.total_cmp(&a.trend_pct));
    up.truncate(n);
    up
}

/// Up to `n` pages with the steepest decline.
pub fn declining(trends: &[PageTrend], n: usize) -> Vec<PageTrend> {
    let mut down: Vec<PageTrend> = trends.iter().filter(|t| t.trend_pct < 0.0).cloned().collect();
    down.sort_by(|a, b| a.trend_pct.total_cmp(&b.trend_pct));
    down.truncate(n);
    down
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScrollDepth {
    /// Event count per scroll bucket ("10", "25", ... "100").
    pub distribution: BTreeMap<String, i64>,
    /// Share of each page's scroll events that reached 90% or more.
    pub completion: BTreeMap<String, f64>,
}

/// Scroll distribution and per-page completion from `pagePath` ×
/// `percentScrolled` rows.
pub fn scroll_depth(set: &MetricSet) -> ScrollDepth {
    let mut depth = ScrollDepth::default();
    let mut per_page: BTreeMap<&str, (i64, i64)> = BTreeMap::new();

    for row in set.rows() {
        let bucket = row.dimension("percentScrolled").unwrap_or("0");
        let count = row.int("eventCount").max(0);
        *depth.distribution.entry(bucket.to_string()).or_default() += count;

        let (total, deep) = per_page.entry(row.dimension("pagePath").unwrap_or("/")).or_default();
        *total += count;
        if DEEP_SCROLL.contains(&bucket) {
            *deep += count;
        }
    }

    depth.completion = per_page
        .into_iter()
        .map(|(path, (total, deep))| (path.to_string(), ratio(deep as f64, total as f64)))
        .collect();
    depth
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutboundDomain {
    pub clicks: i64,
    pub users: i64,
    pub urls: Vec<String>,
}

/// External link clicks grouped by `linkDomain`, skipping links to
/// `internal_domain` and rows without a domain.
pub fn group_outbound(
    links: &MetricSet,
    internal_domain: Option<&str>,
) -> BTreeMap<String, OutboundDomain> {
    let mut domains: BTreeMap<String, OutboundDomain> = BTreeMap::new();

    for row in links.rows() {
        let Some(domain) = row.dimension("linkDomain").filter(|d| !d.is_empty()) else {
            continue;
        };
        if internal_domain.is_some_and(|internal| domain.contains(internal)) {
            continue;
        }

        let entry = domains.entry(domain.to_string()).or_default();
        entry.clicks += row.int("eventCount").max(0);
        entry.users += row.int("totalUsers").max(0);
        if let Some(url) = row.dimension("linkUrl") {
            if !entry.urls.iter().any(|u| u == url) {
                entry.urls.push(url.to_string());
            }
        }
    }

    domains
}
