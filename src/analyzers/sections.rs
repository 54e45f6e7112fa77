//! One async function per report section.
//!
//! Each section issues its own queries and reduces them. A failed query only
//! degrades the section that issued it.

use crate::analyzers::breakdown::{
    OrganicSearch, custom_events, declining, excluding_not_set, group_outbound, has_campaigns,
    mobile_share, named_audiences, organic_search, page_trends, rank_countries, rate_segments,
    scroll_depth, trending,
};
use crate::analyzers::cohort::CohortMatrix;
use crate::analyzers::segment::{
    SortOrder, content_groups, filter_above, share_of, top_row, total_of,
};
use crate::analyzers::types::{
    AcquisitionSummary, Activity, AudienceSummary, ChannelShare, CohortSummary, ContentSummary,
    DailyPoint, DemographicsSummary, EventsSummary, ExecutiveSummary, GeographySummary,
    OutboundSummary, ScrollSummary, SearchSummary, SegmentsSummary, TechnologySummary,
    TimeSummary,
};
use crate::analyzers::utility::rolling_average;
use crate::coerce::to_int;
use crate::config::ReportConfig;
use crate::period::{Period, compare_periods};
use crate::record::{MetricSet, Row};
use crate::services::report_api::{ReportFetcher, ReportRequest, fetch_totals};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Totals compared between the current and previous windows.
pub const EXECUTIVE_METRICS: &[&str] = &[
    "sessions",
    "totalUsers",
    "newUsers",
    "engagedSessions",
    "engagementRate",
    "bounceRate",
    "averageSessionDuration",
    "screenPageViews",
    "eventCount",
    "sessionsPerUser",
    "screenPageViewsPerSession",
];

const ACTIVITY_METRICS: &[&str] = &["active1DayUsers", "active7DayUsers", "active28DayUsers"];

/// Organic totals available once Search Console is linked.
const SEARCH_CONSOLE_METRICS: &[&str] = &[
    "organicGoogleSearchClicks",
    "organicGoogleSearchImpressions",
    "organicGoogleSearchClickThroughRate",
    "organicGoogleSearchAveragePosition",
];

/// Window used for week-over-week page trends.
const TREND_DAYS: u32 = 7;

const ROLLING_WINDOW: usize = 7;

fn log_failure(section: &str, query: &str, set: &MetricSet) {
    if let Some(error) = set.error() {
        warn!(section, query, %error, "Query failed, section degraded");
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn executive<F>(fetcher: &F, days: u32, today: NaiveDate) -> ExecutiveSummary
where
    F: ReportFetcher + ?Sized,
{
    let (comparison, activity, active_now) = tokio::join!(
        compare_periods(fetcher, EXECUTIVE_METRICS, days, today),
        fetch_totals(fetcher, ACTIVITY_METRICS, Period::current(today, days)),
        fetcher.active_users_now(),
    );
    log_failure("executive", "activity", &activity);

    let totals = activity.first_row().cloned().unwrap_or_default();
    ExecutiveSummary {
        comparison,
        activity: Activity {
            dau: totals.int("active1DayUsers"),
            wau: totals.int("active7DayUsers"),
            mau: totals.int("active28DayUsers"),
            error: activity.error().map(str::to_string),
        },
        active_now,
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn acquisition<F>(fetcher: &F, period: Period) -> AcquisitionSummary
where
    F: ReportFetcher + ?Sized,
{
    let channels_req = ReportRequest::new(
        &["sessionDefaultChannelGroup"],
        &[
            "sessions",
            "totalUsers",
            "newUsers",
            "engagedSessions",
            "engagementRate",
            "bounceRate",
            "averageSessionDuration",
            "screenPageViewsPerSession",
            "keyEvents",
        ],
        period,
    )
    .limit(20)
    .order_by("sessions");
    let sources_req = ReportRequest::new(
        &["sessionSource", "sessionMedium"],
        &[
            "sessions",
            "totalUsers",
            "newUsers",
            "engagementRate",
            "bounceRate",
            "averageSessionDuration",
        ],
        period,
    )
    .limit(30)
    .order_by("sessions");
    let first_touch_req = ReportRequest::new(
        &["firstUserSource", "firstUserMedium", "firstUserCampaignName"],
        &["totalUsers", "newUsers", "engagementRate", "averageSessionDuration"],
        period,
    )
    .limit(20)
    .order_by("totalUsers");
    let referrers_req = ReportRequest::new(
        &["pageReferrer"],
        &["sessions", "totalUsers", "engagementRate"],
        period,
    )
    .limit(25)
    .order_by("sessions");

    let (channels, sources, first_touch, referrers) = tokio::join!(
        fetcher.query(&channels_req),
        fetcher.query(&sources_req),
        fetcher.query(&first_touch_req),
        fetcher.query(&referrers_req),
    );
    log_failure("acquisition", "channels", &channels);
    log_failure("acquisition", "first_touch", &first_touch);

    let total = total_of(&channels, "sessions") as f64;
    let top_channel = top_row(&channels, "sessions").map(|row| ChannelShare {
        channel: row
            .dimension("sessionDefaultChannelGroup")
            .unwrap_or_default()
            .to_string(),
        sessions: row.int("sessions"),
        share: share_of(row, "sessions", total),
    });

    AcquisitionSummary {
        has_campaigns: has_campaigns(&first_touch),
        channels,
        sources,
        first_touch,
        referrers,
        top_channel,
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn geography<F>(fetcher: &F, period: Period) -> GeographySummary
where
    F: ReportFetcher + ?Sized,
{
    let countries_req = ReportRequest::new(
        &["country"],
        &[
            "sessions",
            "totalUsers",
            "newUsers",
            "engagedSessions",
            "engagementRate",
            "bounceRate",
            "averageSessionDuration",
            "screenPageViewsPerSession",
            "keyEvents",
        ],
        period,
    )
    .limit(30)
    .order_by("sessions");
    let cities_req = ReportRequest::new(
        &["country", "city"],
        &["sessions", "totalUsers", "engagementRate", "averageSessionDuration"],
        period,
    )
    .limit(40)
    .order_by("sessions");
    let languages_req = ReportRequest::new(
        &["language"],
        &["totalUsers", "sessions", "engagementRate"],
        period,
    )
    .limit(15)
    .order_by("totalUsers");

    let (countries, cities, languages) = tokio::join!(
        fetcher.query(&countries_req),
        fetcher.query(&cities_req),
        fetcher.query(&languages_req),
    );
    log_failure("geography", "countries", &countries);

    GeographySummary {
        ranked: rank_countries(&countries),
        countries,
        cities,
        languages,
    }
}

#[tracing::instrument(skip(fetcher, config))]
pub async fn content<F>(
    fetcher: &F,
    period: Period,
    today: NaiveDate,
    config: &ReportConfig,
) -> ContentSummary
where
    F: ReportFetcher + ?Sized,
{
    let pages_req = ReportRequest::new(
        &["pagePath"],
        &[
            "screenPageViews",
            "totalUsers",
            "engagementRate",
            "bounceRate",
            "averageSessionDuration",
        ],
        period,
    )
    .limit(50)
    .order_by("screenPageViews");
    let landing_req = ReportRequest::new(
        &["landingPage"],
        &[
            "sessions",
            "totalUsers",
            "newUsers",
            "bounceRate",
            "engagementRate",
            "averageSessionDuration",
            "screenPageViewsPerSession",
        ],
        period,
    )
    .limit(30)
    .order_by("sessions");
    let week = |window: Period| {
        ReportRequest::new(&["pagePath"], &["screenPageViews", "totalUsers"], window)
            .limit(30)
            .order_by("screenPageViews")
    };
    let this_week_req = week(Period::current(today, TREND_DAYS));
    let last_week_req = week(Period::previous(today, TREND_DAYS));
    let groups_req = ReportRequest::new(
        &["contentGroup"],
        &["screenPageViews", "totalUsers", "engagementRate"],
        period,
    )
    .limit(20)
    .order_by("screenPageViews");
    let urls_req = ReportRequest::new(&["fullPageUrl"], &["screenPageViews", "totalUsers"], period)
        .limit(10)
        .order_by("screenPageViews");

    let (pages, landing, this_week, last_week, configured_groups, full_urls) = tokio::join!(
        fetcher.query(&pages_req),
        fetcher.query(&landing_req),
        fetcher.query(&this_week_req),
        fetcher.query(&last_week_req),
        fetcher.query(&groups_req),
        fetcher.query(&urls_req),
    );
    log_failure("content", "pages", &pages);
    log_failure("content", "this_week", &this_week);
    log_failure("content", "last_week", &last_week);

    let high_bounce = filter_above(
        &pages,
        "bounceRate",
        config.high_bounce_threshold,
        "screenPageViews",
        config.high_bounce_min_views,
        SortOrder::Descending("bounceRate"),
    );
    let trends = page_trends(&this_week, &last_week, "pagePath", "screenPageViews");
    debug!(
        pages = pages.len(),
        flagged = high_bounce.len(),
        "Content pages reduced"
    );

    ContentSummary {
        groups: content_groups(&pages, &config.content_rules),
        trending: trending(&trends, 10),
        declining: declining(&trends, 10),
        trend_error: this_week.error().or(last_week.error()).map(str::to_string),
        configured_groups: excluding_not_set(&configured_groups, "contentGroup"),
        full_urls,
        pages,
        landing,
        high_bounce,
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn user_segments<F>(fetcher: &F, period: Period) -> SegmentsSummary
where
    F: ReportFetcher + ?Sized,
{
    let request = ReportRequest::new(
        &["newVsReturning"],
        &[
            "sessions",
            "totalUsers",
            "engagedSessions",
            "engagementRate",
            "bounceRate",
            "screenPageViewsPerSession",
            "averageSessionDuration",
        ],
        period,
    )
    .limit(5);

    let new_vs_returning = fetcher.query(&request).await;
    log_failure("segments", "new_vs_returning", &new_vs_returning);
    SegmentsSummary {
        rated: rate_segments(&new_vs_returning, "newVsReturning"),
        new_vs_returning,
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn demographics<F>(fetcher: &F, period: Period) -> DemographicsSummary
where
    F: ReportFetcher + ?Sized,
{
    let metrics = ["totalUsers", "sessions", "engagementRate"];
    let age_req = ReportRequest::new(&["userAgeBracket"], &metrics, period)
        .limit(10)
        .order_by("totalUsers");
    let gender_req = ReportRequest::new(&["userGender"], &metrics, period)
        .limit(5)
        .order_by("totalUsers");
    let interests_req = ReportRequest::new(&["brandingInterest"], &metrics[..2], period)
        .limit(20)
        .order_by("totalUsers");

    let (age, gender, interests) = tokio::join!(
        fetcher.query(&age_req),
        fetcher.query(&gender_req),
        fetcher.query(&interests_req),
    );
    // Demographics need Google signals; failures here are common and expected.
    for (query, set) in [("age", &age), ("gender", &gender), ("interests", &interests)] {
        if let Some(error) = set.error() {
            debug!(query, %error, "Demographics unavailable");
        }
    }

    DemographicsSummary {
        age: excluding_not_set(&age, "userAgeBracket"),
        gender: excluding_not_set(&gender, "userGender"),
        interests: excluding_not_set(&interests, "brandingInterest"),
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn organic<F>(fetcher: &F, period: Period) -> OrganicSearch
where
    F: ReportFetcher + ?Sized,
{
    let totals = fetch_totals(fetcher, SEARCH_CONSOLE_METRICS, period).await;
    if let Some(error) = totals.error() {
        debug!(%error, "Search Console not linked");
    }
    organic_search(&totals)
}

#[tracing::instrument(skip(fetcher))]
pub async fn audiences<F>(fetcher: &F, period: Period) -> AudienceSummary
where
    F: ReportFetcher + ?Sized,
{
    let request = ReportRequest::new(
        &["audienceName"],
        &["totalUsers", "sessions", "engagementRate", "averageSessionDuration"],
        period,
    )
    .limit(20)
    .order_by("totalUsers");

    let audiences = fetcher.query(&request).await;
    log_failure("audiences", "audiences", &audiences);
    AudienceSummary {
        audiences: named_audiences(&audiences),
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn technology<F>(fetcher: &F, period: Period) -> TechnologySummary
where
    F: ReportFetcher + ?Sized,
{
    let metrics = ["sessions", "totalUsers", "engagementRate", "bounceRate"];
    let devices_req = ReportRequest::new(&["deviceCategory"], &metrics, period)
        .limit(5)
        .order_by("sessions");
    let browsers_req = ReportRequest::new(&["browser"], &metrics, period)
        .limit(12)
        .order_by("sessions");
    let os_req = ReportRequest::new(&["operatingSystem"], &metrics[..3], period)
        .limit(10)
        .order_by("sessions");

    let (devices, browsers, operating_systems) = tokio::join!(
        fetcher.query(&devices_req),
        fetcher.query(&browsers_req),
        fetcher.query(&os_req),
    );
    log_failure("technology", "devices", &devices);

    TechnologySummary {
        mobile_share: mobile_share(&devices),
        devices,
        browsers,
        operating_systems,
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn events<F>(fetcher: &F, period: Period) -> EventsSummary
where
    F: ReportFetcher + ?Sized,
{
    let events_req = ReportRequest::new(
        &["eventName"],
        &["eventCount", "totalUsers", "eventCountPerUser"],
        period,
    )
    .limit(30)
    .order_by("eventCount");

    let (events, key_events) = tokio::join!(
        fetcher.query(&events_req),
        fetch_totals(fetcher, &["keyEvents"], period),
    );
    log_failure("events", "events", &events);
    log_failure("events", "key_events", &key_events);

    let key_events = (!key_events.is_failed())
        .then(|| key_events.first_row().map_or(0, |r| r.int("keyEvents")));

    EventsSummary {
        custom: custom_events(&events),
        events,
        key_events,
    }
}

fn sorted_by_dimension<K, F>(set: &MetricSet, key: F) -> MetricSet
where
    K: Ord,
    F: Fn(&Row) -> K,
{
    let mut rows: Vec<Row> = set.rows().cloned().collect();
    rows.sort_by_key(|r| key(r));
    MetricSet::from_rows(rows)
}

#[tracing::instrument(skip(fetcher))]
pub async fn time_patterns<F>(fetcher: &F, period: Period) -> TimeSummary
where
    F: ReportFetcher + ?Sized,
{
    let hourly_req = ReportRequest::new(
        &["hour"],
        &["sessions", "totalUsers", "engagementRate"],
        period,
    )
    .limit(24);
    let daily_req = ReportRequest::new(
        &["date"],
        &[
            "sessions",
            "totalUsers",
            "newUsers",
            "engagedSessions",
            "screenPageViews",
        ],
        period,
    )
    .limit(period.len_days().max(1) as u32);

    let (hourly, daily) = tokio::join!(fetcher.query(&hourly_req), fetcher.query(&daily_req));
    log_failure("time", "daily", &daily);

    let hourly = sorted_by_dimension(&hourly, |r| to_int(r.dimension("hour")));
    let daily_sorted = sorted_by_dimension(&daily, |r| r.dimension("date").unwrap_or("").to_string());

    let sessions: Vec<f64> = daily_sorted.rows().map(|r| r.float("sessions")).collect();
    let points = daily_sorted
        .rows()
        .zip(rolling_average(&sessions, ROLLING_WINDOW))
        .map(|(row, rolling_avg)| DailyPoint {
            date: row.dimension("date").unwrap_or_default().to_string(),
            sessions: row.int("sessions"),
            rolling_avg,
        })
        .collect();

    TimeSummary {
        hourly,
        daily: points,
        daily_error: daily.error().map(str::to_string),
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn scroll<F>(fetcher: &F, period: Period) -> ScrollSummary
where
    F: ReportFetcher + ?Sized,
{
    let request = ReportRequest::new(
        &["pagePath", "percentScrolled"],
        &["eventCount", "totalUsers"],
        period,
    )
    .limit(50)
    .order_by("eventCount");

    let raw = fetcher.query(&request).await;
    log_failure("scroll", "scroll", &raw);
    ScrollSummary {
        depth: scroll_depth(&raw),
        raw,
    }
}

#[tracing::instrument(skip(fetcher, config))]
pub async fn outbound<F>(fetcher: &F, period: Period, config: &ReportConfig) -> OutboundSummary
where
    F: ReportFetcher + ?Sized,
{
    let request = ReportRequest::new(
        &["linkUrl", "linkDomain", "pagePath"],
        &["eventCount", "totalUsers"],
        period,
    )
    .limit(50)
    .order_by("eventCount");

    let links = fetcher.query(&request).await;
    log_failure("outbound", "links", &links);
    OutboundSummary {
        by_domain: group_outbound(&links, config.internal_domain.as_deref()),
        links,
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn site_search<F>(fetcher: &F, period: Period) -> SearchSummary
where
    F: ReportFetcher + ?Sized,
{
    let request = ReportRequest::new(&["searchTerm"], &["eventCount", "totalUsers"], period)
        .limit(50)
        .order_by("eventCount");

    let raw = fetcher.query(&request).await;
    log_failure("search", "terms", &raw);
    let terms = excluding_not_set(&raw, "searchTerm");
    SearchSummary {
        total_searches: total_of(&terms, "eventCount"),
        unique_terms: terms.len(),
        error: raw.error().map(str::to_string),
        terms,
    }
}

#[tracing::instrument(skip(fetcher))]
pub async fn cohorts<F>(fetcher: &F, period: Period) -> CohortSummary
where
    F: ReportFetcher + ?Sized,
{
    let request = ReportRequest::new(
        &["cohort", "cohortNthWeek"],
        &["cohortActiveUsers", "cohortTotalUsers"],
        period,
    )
    .limit(50);

    let raw = fetcher.query(&request).await;
    log_failure("cohorts", "weekly", &raw);
    CohortSummary {
        matrix: CohortMatrix::from_set(&raw),
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Answers by the first requested dimension; unknown queries fail.
    struct Canned {
        by_dimension: HashMap<&'static str, MetricSet>,
    }

    #[async_trait::async_trait]
    impl ReportFetcher for Canned {
        async fn query(&self, request: &ReportRequest) -> MetricSet {
            let key = request.dimensions.first().map_or("", String::as_str);
            self.by_dimension
                .get(key)
                .cloned()
                .unwrap_or_else(|| MetricSet::failed(format!("no data for '{key}'")))
        }

        async fn active_users_now(&self) -> i64 {
            3
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[tokio::test]
    async fn test_acquisition_top_channel_and_campaigns() {
        let channels = MetricSet::from_rows(vec![
            Row::new()
                .with_dimension("sessionDefaultChannelGroup", "Direct")
                .with_metric("sessions", "75"),
            Row::new()
                .with_dimension("sessionDefaultChannelGroup", "Organic Search")
                .with_metric("sessions", "25"),
        ]);
        let first_touch = MetricSet::from_rows(vec![
            Row::new()
                .with_dimension("firstUserCampaignName", "(direct)")
                .with_metric("totalUsers", "40"),
        ]);
        let fetcher = Canned {
            by_dimension: HashMap::from([
                ("sessionDefaultChannelGroup", channels),
                ("firstUserSource", first_touch),
            ]),
        };

        let summary = acquisition(&fetcher, Period::current(today(), 30)).await;
        let top = summary.top_channel.unwrap();
        assert_eq!(top.channel, "Direct");
        assert_eq!(top.share, 0.75);
        assert_eq!(summary.has_campaigns, Some(false));
        assert!(summary.referrers.is_failed());
    }

    #[tokio::test]
    async fn test_failed_first_touch_leaves_campaigns_unknown() {
        let fetcher = Canned {
            by_dimension: HashMap::new(),
        };
        let summary = acquisition(&fetcher, Period::current(today(), 30)).await;
        assert_eq!(summary.has_campaigns, None);
        assert!(summary.top_channel.is_none());
    }

    #[tokio::test]
    async fn test_time_patterns_sorts_and_smooths() {
        let daily: MetricSet = (1..=8)
            .rev()
            .map(|d| {
                Row::new()
                    .with_dimension("date", &format!("202406{d:02}"))
                    .with_metric("sessions", &(d * 10).to_string())
            })
            .collect();
        let hourly = MetricSet::from_rows(vec![
            Row::new().with_dimension("hour", "10"),
            Row::new().with_dimension("hour", "2"),
        ]);
        let fetcher = Canned {
            by_dimension: HashMap::from([("date", daily), ("hour", hourly)]),
        };

        let summary = time_patterns(&fetcher, Period::current(today(), 30)).await;
        assert_eq!(summary.daily.len(), 8);
        assert_eq!(summary.daily[0].date, "20240601");
        assert_eq!(summary.daily[5].rolling_avg, None);
        assert_eq!(summary.daily[6].rolling_avg, Some(40.0));
        assert_eq!(summary.daily[7].rolling_avg, Some(50.0));

        let hours: Vec<_> = summary
            .hourly
            .rows()
            .filter_map(|r| r.dimension("hour"))
            .collect();
        assert_eq!(hours, vec!["2", "10"]);
    }

    #[tokio::test]
    async fn test_content_flags_high_bounce_and_trends() {
        let pages = MetricSet::from_rows(vec![
            Row::new()
                .with_dimension("pagePath", "/agents/1")
                .with_metric("screenPageViews", "40")
                .with_metric("bounceRate", "0.2"),
            Row::new()
                .with_dimension("pagePath", "/pricing")
                .with_metric("screenPageViews", "9")
                .with_metric("bounceRate", "0.8"),
        ]);
        let fetcher = Canned {
            by_dimension: HashMap::from([("pagePath", pages)]),
        };

        let summary = content(
            &fetcher,
            Period::current(today(), 30),
            today(),
            &ReportConfig::default(),
        )
        .await;
        assert_eq!(summary.high_bounce.len(), 1);
        assert_eq!(summary.groups["agents"].views, 40);
        // Same rows in both weeks: nothing moves.
        assert!(summary.trending.is_empty());
        assert!(summary.declining.is_empty());
        assert!(summary.landing.is_failed());
        assert!(summary.configured_groups.is_failed());
        assert!(summary.trend_error.is_none());
    }

    /// Serves `pages` for page queries except over `failing`, which errors.
    struct FailingWindow {
        pages: MetricSet,
        failing: Period,
    }

    #[async_trait::async_trait]
    impl ReportFetcher for FailingWindow {
        async fn query(&self, request: &ReportRequest) -> MetricSet {
            if request.period == self.failing {
                return MetricSet::failed("backend error");
            }
            match request.dimensions.first().map(String::as_str) {
                Some("pagePath") => self.pages.clone(),
                _ => MetricSet::failed("not recorded"),
            }
        }

        async fn active_users_now(&self) -> i64 {
            0
        }
    }

    #[tokio::test]
    async fn test_failed_current_week_reports_trend_error() {
        let pages = MetricSet::from_rows(vec![
            Row::new()
                .with_dimension("pagePath", "/docs")
                .with_metric("screenPageViews", "50"),
        ]);
        let fetcher = FailingWindow {
            pages,
            failing: Period::current(today(), TREND_DAYS),
        };

        let summary = content(
            &fetcher,
            Period::current(today(), 30),
            today(),
            &ReportConfig::default(),
        )
        .await;
        assert_eq!(summary.pages.len(), 1);
        assert_eq!(summary.trend_error.as_deref(), Some("backend error"));
        assert!(summary.trending.is_empty());
        assert!(summary.declining.is_empty());
    }

    #[tokio::test]
    async fn test_search_drops_not_set_terms() {
        let terms = MetricSet::from_rows(vec![
            Row::new()
                .with_dimension("searchTerm", "pricing")
                .with_metric("eventCount", "7"),
            Row::new()
                .with_dimension("searchTerm", "(not set)")
                .with_metric("eventCount", "90"),
        ]);
        let fetcher = Canned {
            by_dimension: HashMap::from([("searchTerm", terms)]),
        };

        let summary = site_search(&fetcher, Period::current(today(), 30)).await;
        assert_eq!(summary.total_searches, 7);
        assert_eq!(summary.unique_terms, 1);
        assert!(summary.error.is_none());
    }

    #[tokio::test]
    async fn test_user_segments_rates_new_and_returning() {
        let segments = MetricSet::from_rows(vec![
            Row::new()
                .with_dimension("newVsReturning", "new")
                .with_metric("sessions", "300")
                .with_metric("engagementRate", "0.5")
                .with_metric("screenPageViewsPerSession", "5")
                .with_metric("averageSessionDuration", "300"),
            Row::new()
                .with_dimension("newVsReturning", "returning")
                .with_metric("sessions", "100"),
        ]);
        let fetcher = Canned {
            by_dimension: HashMap::from([("newVsReturning", segments)]),
        };

        let summary = user_segments(&fetcher, Period::current(today(), 30)).await;
        assert_eq!(summary.rated.len(), 2);
        assert_eq!(summary.rated[0].segment, "new");
        assert!((summary.rated[0].quality - 0.8).abs() < 1e-9);
        assert_eq!(summary.rated[1].quality, 0.0);
    }

    #[tokio::test]
    async fn test_demographics_filters_not_set_and_keeps_failures() {
        let gender = MetricSet::from_rows(vec![
            Row::new()
                .with_dimension("userGender", "female")
                .with_metric("totalUsers", "40"),
            Row::new()
                .with_dimension("userGender", "(not set)")
                .with_metric("totalUsers", "400"),
        ]);
        let fetcher = Canned {
            by_dimension: HashMap::from([("userGender", gender)]),
        };

        let summary = demographics(&fetcher, Period::current(today(), 30)).await;
        assert_eq!(summary.gender.len(), 1);
        assert_eq!(
            summary.gender.first_row().unwrap().dimension("userGender"),
            Some("female")
        );
        assert!(summary.age.is_failed());
        assert!(summary.interests.is_failed());
    }

    #[tokio::test]
    async fn test_organic_search_unlinked_is_unavailable() {
        let fetcher = Canned {
            by_dimension: HashMap::new(),
        };
        let search = organic(&fetcher, Period::current(today(), 30)).await;
        assert!(!search.available);
        assert_eq!(search.error.as_deref(), Some("no data for ''"));
    }

    #[tokio::test]
    async fn test_audiences_hide_all_users() {
        let rows = MetricSet::from_rows(vec![
            Row::new()
                .with_dimension("audienceName", "All Users")
                .with_metric("totalUsers", "900"),
            Row::new()
                .with_dimension("audienceName", "Purchasers")
                .with_metric("totalUsers", "30"),
        ]);
        let fetcher = Canned {
            by_dimension: HashMap::from([("audienceName", rows)]),
        };

        let summary = audiences(&fetcher, Period::current(today(), 30)).await;
        assert_eq!(summary.audiences.len(), 1);
        assert_eq!(summary.audiences.first_row().unwrap().int("totalUsers"), 30);
    }

    #[tokio::test]
    async fn test_executive_failure_keeps_realtime() {
        let fetcher = Canned {
            by_dimension: HashMap::new(),
        };
        let summary = executive(&fetcher, 30, today()).await;
        assert!(summary.comparison.current_missing());
        assert_eq!(summary.activity.mau, 0);
        assert!(summary.activity.error.is_some());
        assert_eq!(summary.active_now, 3);
    }
}
