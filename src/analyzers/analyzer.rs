use crate::analyzers::insights::{InsightContext, generate};
use crate::analyzers::scoring::{ScoreInputs, score_all};
use crate::analyzers::sections;
use crate::analyzers::types::{
    AcquisitionSummary, ContentSummary, DeepDive, ExecutiveSummary, GeographySummary,
};
use crate::config::ReportConfig;
use crate::period::Period;
use crate::services::report_api::ReportFetcher;
use chrono::NaiveDate;
use tracing::info;

/// Runs every report section concurrently, then scores the result and
/// derives recommendations.
#[tracing::instrument(skip(fetcher, config))]
pub async fn run_deep_dive<F>(
    fetcher: &F,
    config: &ReportConfig,
    property: &str,
    property_id: &str,
    days: u32,
    today: NaiveDate,
) -> DeepDive
where
    F: ReportFetcher + ?Sized,
{
    let period = Period::current(today, days);
    info!(start = %period.start, end = %period.end, "Starting deep dive");

    let (
        executive,
        acquisition,
        geography,
        content,
        segments,
        demographics,
        organic,
        audiences,
        technology,
        events,
        time,
        scroll,
        outbound,
        search,
        cohorts,
    ) = tokio::join!(
        sections::executive(fetcher, days, today),
        sections::acquisition(fetcher, period),
        sections::geography(fetcher, period),
        sections::content(fetcher, period, today, config),
        sections::user_segments(fetcher, period),
        sections::demographics(fetcher, period),
        sections::organic(fetcher, period),
        sections::audiences(fetcher, period),
        sections::technology(fetcher, period),
        sections::events(fetcher, period),
        sections::time_patterns(fetcher, period),
        sections::scroll(fetcher, period),
        sections::outbound(fetcher, period, config),
        sections::site_search(fetcher, period),
        sections::cohorts(fetcher, period),
    );

    let inputs = ScoreInputs {
        countries: config.include_geo_diversity.then_some(&geography.countries),
        mobile_share: technology.mobile_share,
        ..score_inputs(&executive, &acquisition, &content)
    };
    let scores = score_all(&inputs);
    let insights = generate(
        &scores,
        &insight_context(&executive, &acquisition, &geography, &content),
    );
    let overall = scores.overall();
    let grade = scores.grade();
    info!(overall, %grade, insights = insights.len(), "Deep dive complete");

    DeepDive {
        property: property.to_string(),
        property_id: property_id.to_string(),
        generated_on: today,
        days,
        executive,
        acquisition,
        geography,
        content,
        segments,
        demographics,
        organic,
        audiences,
        technology,
        events,
        time,
        scroll,
        outbound,
        search,
        cohorts,
        scores,
        overall,
        grade,
        insights,
    }
}

fn score_inputs<'a>(
    executive: &ExecutiveSummary,
    acquisition: &'a AcquisitionSummary,
    content: &ContentSummary,
) -> ScoreInputs<'a> {
    let comparison = &executive.comparison;
    let current_known = !comparison.current_missing();
    // A failed previous window reads as zero sessions; that is not a new site.
    let both_known = current_known && comparison.previous_error.is_none();

    ScoreInputs {
        engagement: current_known.then(|| {
            (
                comparison.current("engagementRate"),
                comparison.current("averageSessionDuration"),
                comparison.current("screenPageViewsPerSession"),
            )
        }),
        channels: Some(&acquisition.channels),
        countries: None,
        dau: executive.activity.dau,
        mau: executive.activity.mau,
        sessions: both_known
            .then(|| (comparison.current("sessions"), comparison.previous("sessions"))),
        pages: (!content.pages.is_empty())
            .then(|| (content.high_bounce.len(), content.pages.len())),
        mobile_share: None,
    }
}

fn insight_context(
    executive: &ExecutiveSummary,
    acquisition: &AcquisitionSummary,
    geography: &GeographySummary,
    content: &ContentSummary,
) -> InsightContext {
    InsightContext {
        top_channel: acquisition
            .top_channel
            .as_ref()
            .map(|top| (top.channel.clone(), top.share)),
        dau: executive.activity.dau,
        mau: executive.activity.mau,
        worst_page: content.high_bounce.first_row().map(|row| {
            (
                row.dimension("pagePath").unwrap_or_default().to_string(),
                row.float("bounceRate"),
            )
        }),
        best_country: geography
            .ranked
            .first()
            .map(|c| (c.country.clone(), c.quality)),
        has_campaigns: acquisition.has_campaigns,
    }
}
