use chrono::NaiveDate;
use ga_deep_dive::analyzers::analyzer::run_deep_dive;
use ga_deep_dive::analyzers::scoring::Domain;
use ga_deep_dive::analyzers::types::DeepDive;
use ga_deep_dive::config::ReportConfig;
use ga_deep_dive::output::{append_record, render_text};
use ga_deep_dive::parser::parse_report;
use ga_deep_dive::period::Period;
use ga_deep_dive::record::{MetricSet, Row};
use ga_deep_dive::services::report_api::{ReportFetcher, ReportRequest};

const DAYS: u32 = 30;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

/// Serves recorded GA4 responses by first dimension. Totals come from fixed
/// per-period values; anything else fails like an unsupported query would.
struct RecordedProperty;

impl RecordedProperty {
    fn totals(&self, request: &ReportRequest) -> MetricSet {
        let values: &[(&str, &str)] = if request.period == Period::current(today(), DAYS) {
            &[
                ("sessions", "1200"),
                ("totalUsers", "800"),
                ("engagementRate", "0.6"),
                ("averageSessionDuration", "180.0"),
                ("screenPageViewsPerSession", "2.0"),
                ("bounceRate", "0.4"),
                ("active1DayUsers", "30"),
                ("active7DayUsers", "120"),
                ("active28DayUsers", "300"),
                ("keyEvents", "17"),
            ]
        } else if request.period == Period::previous(today(), DAYS) {
            &[("sessions", "1000"), ("totalUsers", "700")]
        } else {
            return MetricSet::failed("unexpected period");
        };

        let row = request.metrics.iter().fold(Row::new(), |row, metric| {
            match values.iter().find(|(name, _)| *name == metric.as_str()) {
                Some((name, value)) => row.with_metric(name, value),
                None => row,
            }
        });
        MetricSet::from_rows(vec![row])
    }
}

#[async_trait::async_trait]
impl ReportFetcher for RecordedProperty {
    async fn query(&self, request: &ReportRequest) -> MetricSet {
        let single = request.dimensions.len() == 1;
        let bytes: &[u8] = match request.dimensions.first().map(String::as_str) {
            None => return self.totals(request),
            Some("sessionDefaultChannelGroup") => &include_bytes!("fixtures/channels.json")[..],
            Some("country") if single => &include_bytes!("fixtures/countries.json")[..],
            Some("deviceCategory") => &include_bytes!("fixtures/devices.json")[..],
            Some("pagePath") if single => &include_bytes!("fixtures/pages.json")[..],
            Some("cohort") => &include_bytes!("fixtures/cohorts.json")[..],
            Some("newVsReturning") => &include_bytes!("fixtures/segments.json")[..],
            Some(other) => return MetricSet::failed(format!("no recording for '{other}'")),
        };
        parse_report(bytes).unwrap_or_else(|e| MetricSet::failed(e.to_string()))
    }

    async fn active_users_now(&self) -> i64 {
        4
    }
}

async fn recorded_report(config: &ReportConfig) -> DeepDive {
    run_deep_dive(&RecordedProperty, config, "solvr", "523300499", DAYS, today()).await
}

#[test]
fn test_fixture_parses() {
    let set =
        parse_report(include_bytes!("fixtures/countries.json")).expect("Failed to parse report");
    assert_eq!(set.len(), 4);
    assert_eq!(set.first_row().unwrap().dimension("country"), Some("United States"));
}

#[tokio::test]
async fn test_full_pipeline() {
    let report = recorded_report(&ReportConfig::default()).await;

    assert_eq!(report.scores.get(Domain::Engagement), Some(67));
    assert_eq!(report.scores.get(Domain::TrafficDiversity), Some(40));
    assert_eq!(report.scores.get(Domain::Mobile), Some(95));
    assert_eq!(report.scores.get(Domain::Content), Some(70));
    assert_eq!(report.scores.get(Domain::Growth), Some(70));
    assert_eq!(report.scores.get(Domain::Retention), Some(50));
    assert_eq!(report.scores.get(Domain::GeoDiversity), Some(60));
    assert_eq!(report.overall, 64);
    assert_eq!(report.grade, "C");

    assert_eq!(report.insights.len(), 3);
    assert!(report.insights[0].starts_with("60% of traffic from Direct"));
    assert!(report.insights[1].starts_with("Fix /pricing: 85.0% bounce rate"));
    assert!(report.insights[2].starts_with("Germany"));

    assert_eq!(report.executive.active_now, 4);
    assert_eq!(report.executive.activity.wau, 120);
    assert_eq!(report.events.key_events, Some(17));
    assert_eq!(report.acquisition.has_campaigns, None);
    assert_eq!(report.content.groups["agents"].views, 330);
    assert_eq!(report.cohorts.matrix.retention("2024-06-02", 1), Some(0.4));
    assert_eq!(report.cohorts.matrix.retention("2024-06-02", 2), None);
    assert_eq!(report.cohorts.matrix.recent(1), vec!["2024-06-09"]);

    // 0.5*0.4 + 0.5*0.3 + 0.5*0.3 and 0.75*0.4 + 0.3 + 0.3
    let rated = &report.segments.rated;
    assert_eq!(rated.len(), 2);
    assert!((rated[0].quality - 0.5).abs() < 1e-9);
    assert!((rated[1].quality - 0.9).abs() < 1e-9);
    assert!(report.demographics.gender.is_failed());
    assert!(report.organic.available);
}

#[tokio::test]
async fn test_report_renders_and_serializes() {
    let report = recorded_report(&ReportConfig::default()).await;

    let text = render_text(&report).unwrap();
    assert!(text.contains("Overall: 64/100 (C)"));
    assert!(text.contains("Outbound clicks: no data"));
    assert!(text.contains("Campaigns: no data"));
    assert!(text.contains("Demographics: no data"));
    assert!(text.contains("returning"));

    let first = serde_json::to_string(&report).unwrap();
    let second = serde_json::to_string(&report).unwrap();
    assert_eq!(first, second);

    let json: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(json["scores"]["traffic_diversity"], 40);
    assert_eq!(json["grade"], "C");
    assert_eq!(json["cohorts"]["matrix"]["2024-06-02"]["1"]["retention"], 0.4);
}

#[tokio::test]
async fn test_history_appends_rows() {
    let config = ReportConfig {
        include_geo_diversity: false,
        ..ReportConfig::default()
    };
    let report = recorded_report(&config).await;
    assert_eq!(report.scores.get(Domain::GeoDiversity), None);

    let path = format!(
        "{}/ga_deep_dive_integration_history.csv",
        std::env::temp_dir().display()
    );
    let _ = std::fs::remove_file(&path);
    append_record(&path, &report.history_row()).unwrap();
    append_record(&path, &report.history_row()).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("date,property,days,overall,grade"));
    assert!(lines[1].starts_with("2024-06-30,solvr,30,"));
    assert!(lines[1].ends_with(','));

    std::fs::remove_file(&path).unwrap();
}
