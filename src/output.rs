//! Output formatting and persistence for deep-dive reports.
//!
//! Supports a plain-text report, JSON serialization, and CSV append of the
//! score history.

use anyhow::Result;
use std::fmt::Write;
use tracing::debug;

use crate::analyzers::cohort::CohortMatrix;
use crate::analyzers::scoring::Domain;
use crate::analyzers::types::{DeepDive, ScoreHistoryRow};
use crate::period::{Change, Delta};
use crate::record::MetricSet;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Rows shown per table.
const TABLE_ROWS: usize = 10;

/// Cohorts shown in the retention grid.
const COHORT_ROWS: usize = 8;

/// Week offsets shown per cohort.
const COHORT_WEEKS: u32 = 4;

/// Daily points shown in the time section.
const DAILY_ROWS: usize = 14;

const ABSENT: &str = "—";

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn change(delta: &Delta) -> String {
    match delta.pct {
        Change::Unchanged => "unchanged".to_string(),
        Change::New => "new".to_string(),
        Change::Percent(p) => format!("{p:+.1}%"),
    }
}

fn heading(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "== {title} ==")
}

/// Writes a "no data" marker when `set` has no rows. Returns `true` when it did.
fn no_data(out: &mut String, label: &str, set: &MetricSet) -> Result<bool, std::fmt::Error> {
    match set.error() {
        Some(error) => writeln!(out, "  {label}: no data ({error})")?,
        None if set.is_empty() => writeln!(out, "  {label}: no data")?,
        None => return Ok(false),
    }
    Ok(true)
}

/// Top rows of `set` as `dimension  metric...` lines.
fn table(
    out: &mut String,
    label: &str,
    set: &MetricSet,
    dimension: &str,
    metrics: &[&str],
) -> std::fmt::Result {
    if no_data(out, label, set)? {
        return Ok(());
    }
    writeln!(out, "  {label}:")?;
    for row in set.rows().take(TABLE_ROWS) {
        write!(out, "    {:<32}", row.dimension(dimension).unwrap_or(ABSENT))?;
        for metric in metrics {
            write!(out, " {metric}={}", row.metric(metric).unwrap_or("0"))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_scores(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    heading(out, "Health")?;
    writeln!(out, "  Overall: {}/100 ({})", report.overall, report.grade)?;
    for domain in Domain::ALL {
        match report.scores.get(domain) {
            Some(value) => writeln!(out, "  {:<20}{value:>4}", domain.label())?,
            None => writeln!(out, "  {:<20}{ABSENT:>4}", domain.label())?,
        }
    }
    Ok(())
}

fn write_executive(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    let executive = &report.executive;
    let cmp = &executive.comparison;
    heading(out, "Executive summary")?;
    writeln!(
        out,
        "  {}..{} vs {}..{}",
        cmp.current_period.start,
        cmp.current_period.end,
        cmp.previous_period.start,
        cmp.previous_period.end
    )?;
    if let Some(error) = &cmp.current_error {
        writeln!(out, "  current period: no data ({error})")?;
    }
    if let Some(error) = &cmp.previous_error {
        writeln!(out, "  previous period: no data ({error})")?;
    }
    for item in &cmp.deltas {
        let d = &item.delta;
        writeln!(
            out,
            "  {:<28}{:>12.2} (prev {:.2}, {})",
            item.metric,
            d.current,
            d.previous,
            change(d)
        )?;
    }

    let activity = &executive.activity;
    match &activity.error {
        Some(error) => writeln!(out, "  DAU/WAU/MAU: no data ({error})")?,
        None => writeln!(
            out,
            "  DAU/WAU/MAU: {}/{}/{}",
            activity.dau, activity.wau, activity.mau
        )?,
    }
    writeln!(out, "  Active now: {}", executive.active_now)
}

fn write_acquisition(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    let acq = &report.acquisition;
    heading(out, "Acquisition")?;
    table(
        out,
        "Channels",
        &acq.channels,
        "sessionDefaultChannelGroup",
        &["sessions", "engagementRate"],
    )?;
    table(out, "Referrers", &acq.referrers, "pageReferrer", &["sessions"])?;
    let campaigns = match acq.has_campaigns {
        Some(true) => "tracked",
        Some(false) => "none tracked",
        None => "no data",
    };
    writeln!(out, "  Campaigns: {campaigns}")
}

fn write_geography(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    let geo = &report.geography;
    heading(out, "Geography")?;
    if no_data(out, "Countries", &geo.countries)? {
        return Ok(());
    }
    writeln!(out, "  Countries by quality:")?;
    for c in geo.ranked.iter().take(TABLE_ROWS) {
        writeln!(
            out,
            "    {:<24} sessions={} share={} engagement={} quality={:.2}",
            c.country,
            c.sessions,
            pct(c.share),
            pct(c.engagement_rate),
            c.quality
        )?;
    }
    Ok(())
}

fn write_content(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    let content = &report.content;
    heading(out, "Content")?;
    table(
        out,
        "Top pages",
        &content.pages,
        "pagePath",
        &["screenPageViews", "bounceRate"],
    )?;

    if !content.pages.is_empty() {
        if content.high_bounce.is_empty() {
            writeln!(out, "  High bounce pages: none")?;
        } else {
            writeln!(out, "  High bounce pages:")?;
            for row in content.high_bounce.rows().take(TABLE_ROWS) {
                writeln!(
                    out,
                    "    {:<32} bounce={} views={}",
                    row.dimension("pagePath").unwrap_or(ABSENT),
                    pct(row.float("bounceRate")),
                    row.int("screenPageViews")
                )?;
            }
        }

        writeln!(out, "  Sections:")?;
        for (name, group) in &content.groups {
            writeln!(
                out,
                "    {:<16} views={} users={} pages={} engagement={}",
                name,
                group.views,
                group.users,
                group.pages,
                pct(group.avg_engagement)
            )?;
        }
    }

    if !content.configured_groups.is_empty() {
        table(
            out,
            "Configured content groups",
            &content.configured_groups,
            "contentGroup",
            &["screenPageViews", "totalUsers"],
        )?;
    }

    if let Some(error) = &content.trend_error {
        writeln!(out, "  Weekly trends: no data ({error})")?;
    }
    for (label, trends) in [("Trending", &content.trending), ("Declining", &content.declining)] {
        if trends.is_empty() {
            continue;
        }
        writeln!(out, "  {label}:")?;
        for t in trends {
            writeln!(out, "    {:<32} {:+.0}%", t.path, t.trend_pct)?;
        }
    }
    Ok(())
}

fn write_audience(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    heading(out, "Audience")?;
    let segments = &report.segments;
    if !no_data(out, "New vs returning", &segments.new_vs_returning)? {
        writeln!(out, "  New vs returning:")?;
        for seg in &segments.rated {
            writeln!(
                out,
                "    {:<16} sessions={} engagement={} bounce={} quality={:.2}",
                seg.segment,
                seg.sessions,
                pct(seg.engagement_rate),
                pct(seg.bounce_rate),
                seg.quality
            )?;
        }
    }

    let demo = &report.demographics;
    if demo.age.is_empty() && demo.gender.is_empty() && demo.interests.is_empty() {
        writeln!(out, "  Demographics: no data (enable Google signals)")?;
    } else {
        table(out, "Age", &demo.age, "userAgeBracket", &["totalUsers"])?;
        table(out, "Gender", &demo.gender, "userGender", &["totalUsers"])?;
        table(out, "Interests", &demo.interests, "brandingInterest", &["totalUsers"])?;
    }

    if !report.audiences.audiences.is_empty() {
        table(
            out,
            "Audiences",
            &report.audiences.audiences,
            "audienceName",
            &["totalUsers", "engagementRate"],
        )?;
    }

    let organic = &report.organic;
    if organic.available {
        writeln!(
            out,
            "  Organic search: {} clicks, {} impressions, CTR {}, avg position {:.1}",
            organic.clicks,
            organic.impressions,
            pct(organic.ctr),
            organic.avg_position
        )
    } else {
        writeln!(out, "  Organic search: Search Console not linked")
    }
}

fn write_technology(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    let tech = &report.technology;
    heading(out, "Technology")?;
    table(out, "Devices", &tech.devices, "deviceCategory", &["sessions"])?;
    table(out, "Browsers", &tech.browsers, "browser", &["sessions"])?;
    match tech.mobile_share {
        Some(share) => writeln!(out, "  Mobile + tablet share: {}", pct(share)),
        None => writeln!(out, "  Mobile + tablet share: no data"),
    }
}

fn write_events(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    let events = &report.events;
    heading(out, "Events")?;
    table(out, "All events", &events.events, "eventName", &["eventCount", "totalUsers"])?;
    if !events.events.is_empty() {
        table(out, "Custom events", &events.custom, "eventName", &["eventCount"])?;
    }
    match events.key_events {
        Some(count) => writeln!(out, "  Key events: {count}"),
        None => writeln!(out, "  Key events: no data"),
    }
}

fn write_time(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    let time = &report.time;
    heading(out, "Daily trend")?;
    if let Some(error) = &time.daily_error {
        return writeln!(out, "  no data ({error})");
    }
    if time.daily.is_empty() {
        return writeln!(out, "  no data");
    }
    let skip = time.daily.len().saturating_sub(DAILY_ROWS);
    for point in time.daily.iter().skip(skip) {
        match point.rolling_avg {
            Some(avg) => writeln!(out, "  {} {:>6}  7d avg {avg:.1}", point.date, point.sessions)?,
            None => writeln!(out, "  {} {:>6}  7d avg {ABSENT}", point.date, point.sessions)?,
        }
    }
    Ok(())
}

fn write_engagement_depth(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    heading(out, "Scroll depth")?;
    if !no_data(out, "Scroll events", &report.scroll.raw)? {
        for (bucket, count) in &report.scroll.depth.distribution {
            writeln!(out, "    {bucket:>4}%  {count}")?;
        }
    }

    heading(out, "Outbound links")?;
    if !no_data(out, "Outbound clicks", &report.outbound.links)? {
        if report.outbound.by_domain.is_empty() {
            writeln!(out, "  Outbound clicks: none external")?;
        }
        for (domain, stats) in report.outbound.by_domain.iter().take(TABLE_ROWS) {
            writeln!(
                out,
                "    {domain:<32} clicks={} users={}",
                stats.clicks, stats.users
            )?;
        }
    }

    heading(out, "Site search")?;
    let search = &report.search;
    match &search.error {
        Some(error) => writeln!(out, "  no data ({error})")?,
        None => {
            writeln!(
                out,
                "  {} searches, {} unique terms",
                search.total_searches, search.unique_terms
            )?;
            table(out, "Terms", &search.terms, "searchTerm", &["eventCount"])?;
        }
    }
    Ok(())
}

fn write_cohorts(out: &mut String, matrix: &CohortMatrix, raw: &MetricSet) -> std::fmt::Result {
    heading(out, "Weekly cohort retention")?;
    if no_data(out, "Cohorts", raw)? {
        return Ok(());
    }
    write!(out, "  {:<12}", "cohort")?;
    for week in 0..=COHORT_WEEKS {
        write!(out, " {:>7}", format!("W{week}"))?;
    }
    writeln!(out)?;
    for cohort in matrix.recent(COHORT_ROWS) {
        write!(out, "  {cohort:<12}")?;
        for cell in matrix.window(cohort, 0..=COHORT_WEEKS) {
            let text = cell.map_or_else(|| ABSENT.to_string(), pct);
            write!(out, " {text:>7}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_report(out: &mut String, report: &DeepDive) -> std::fmt::Result {
    writeln!(
        out,
        "GA4 deep dive: {} ({}), last {} days to {}",
        report.property, report.property_id, report.days, report.generated_on
    )?;
    write_scores(out, report)?;
    write_executive(out, report)?;
    write_acquisition(out, report)?;
    write_geography(out, report)?;
    write_content(out, report)?;
    write_audience(out, report)?;
    write_technology(out, report)?;
    write_events(out, report)?;
    write_time(out, report)?;
    write_engagement_depth(out, report)?;
    write_cohorts(out, &report.cohorts.matrix, &report.cohorts.raw)?;

    heading(out, "Insights")?;
    if report.insights.is_empty() {
        writeln!(out, "  No critical issues detected.")?;
    }
    for insight in &report.insights {
        writeln!(out, "  - {insight}")?;
    }
    Ok(())
}

/// Renders the report as plain text sections.
pub fn render_text(report: &DeepDive) -> Result<String> {
    let mut out = String::new();
    write_report(&mut out, report)?;
    Ok(out)
}

/// Prints the report as pretty JSON on stdout.
pub fn print_json(report: &DeepDive) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Appends a [`ScoreHistoryRow`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, row: &ScoreHistoryRow) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(row)?;
    writer.flush()?;

    Ok(())
}
