//! Data types produced by the report pass.

use crate::analyzers::breakdown::{
    CountryQuality, OrganicSearch, OutboundDomain, PageTrend, ScrollDepth, SegmentQuality,
};
use crate::analyzers::cohort::CohortMatrix;
use crate::analyzers::scoring::{Domain, ScoreCard};
use crate::analyzers::segment::ContentGroup;
use crate::period::PeriodComparison;
use crate::record::MetricSet;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Daily, weekly and monthly active users over the report window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Activity {
    pub dau: i64,
    pub wau: i64,
    pub mau: i64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutiveSummary {
    pub comparison: PeriodComparison,
    pub activity: Activity,
    pub active_now: i64,
}

/// Leading acquisition channel and its share of sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelShare {
    pub channel: String,
    pub sessions: i64,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionSummary {
    pub channels: MetricSet,
    pub sources: MetricSet,
    pub first_touch: MetricSet,
    pub referrers: MetricSet,
    pub top_channel: Option<ChannelShare>,
    /// `None` when first-touch data is unavailable.
    pub has_campaigns: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeographySummary {
    pub countries: MetricSet,
    /// Countries ordered by quality score, best first.
    pub ranked: Vec<CountryQuality>,
    pub cities: MetricSet,
    pub languages: MetricSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentSummary {
    pub pages: MetricSet,
    pub landing: MetricSet,
    /// Every page over the bounce threshold, worst first.
    pub high_bounce: MetricSet,
    pub groups: BTreeMap<String, ContentGroup>,
    pub trending: Vec<PageTrend>,
    pub declining: Vec<PageTrend>,
    /// Set when either weekly trend query failed.
    pub trend_error: Option<String>,
    /// Content groups configured on the property, if any.
    pub configured_groups: MetricSet,
    pub full_urls: MetricSet,
}

/// New versus returning visitors.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentsSummary {
    pub new_vs_returning: MetricSet,
    pub rated: Vec<SegmentQuality>,
}

/// Age, gender and interests. Needs Google signals on the property.
#[derive(Debug, Clone, Serialize)]
pub struct DemographicsSummary {
    pub age: MetricSet,
    pub gender: MetricSet,
    pub interests: MetricSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudienceSummary {
    pub audiences: MetricSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct TechnologySummary {
    pub devices: MetricSet,
    pub browsers: MetricSet,
    pub operating_systems: MetricSet,
    pub mobile_share: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventsSummary {
    pub events: MetricSet,
    pub custom: MetricSet,
    pub key_events: Option<i64>,
}

/// Sessions on one day with the trailing 7-day mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub sessions: i64,
    pub rolling_avg: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSummary {
    /// Ordered by hour of day.
    pub hourly: MetricSet,
    pub daily: Vec<DailyPoint>,
    pub daily_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrollSummary {
    pub raw: MetricSet,
    pub depth: ScrollDepth,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundSummary {
    pub links: MetricSet,
    pub by_domain: BTreeMap<String, OutboundDomain>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    pub terms: MetricSet,
    pub total_searches: i64,
    pub unique_terms: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortSummary {
    pub raw: MetricSet,
    pub matrix: CohortMatrix,
}

/// Complete result of one report run.
#[derive(Debug, Clone, Serialize)]
pub struct DeepDive {
    pub property: String,
    pub property_id: String,
    pub generated_on: NaiveDate,
    pub days: u32,
    pub executive: ExecutiveSummary,
    pub acquisition: AcquisitionSummary,
    pub geography: GeographySummary,
    pub content: ContentSummary,
    pub segments: SegmentsSummary,
    pub demographics: DemographicsSummary,
    pub organic: OrganicSearch,
    pub audiences: AudienceSummary,
    pub technology: TechnologySummary,
    pub events: EventsSummary,
    pub time: TimeSummary,
    pub scroll: ScrollSummary,
    pub outbound: OutboundSummary,
    pub search: SearchSummary,
    pub cohorts: CohortSummary,
    pub scores: ScoreCard,
    pub overall: u8,
    pub grade: String,
    pub insights: Vec<String>,
}

impl DeepDive {
    pub fn history_row(&self) -> ScoreHistoryRow {
        ScoreHistoryRow {
            date: self.generated_on,
            property: self.property.clone(),
            days: self.days,
            overall: self.overall,
            grade: self.grade.clone(),
            engagement: self.scores.get(Domain::Engagement),
            traffic_diversity: self.scores.get(Domain::TrafficDiversity),
            mobile: self.scores.get(Domain::Mobile),
            content: self.scores.get(Domain::Content),
            growth: self.scores.get(Domain::Growth),
            retention: self.scores.get(Domain::Retention),
            geo_diversity: self.scores.get(Domain::GeoDiversity),
        }
    }
}

/// One line of the score history CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreHistoryRow {
    pub date: NaiveDate,
    pub property: String,
    pub days: u32,
    pub overall: u8,
    pub grade: String,
    pub engagement: Option<u8>,
    pub traffic_diversity: Option<u8>,
    pub mobile: Option<u8>,
    pub content: Option<u8>,
    pub growth: Option<u8>,
    pub retention: Option<u8>,
    pub geo_diversity: Option<u8>,
}
