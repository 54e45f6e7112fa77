//! Bounded 0–100 health scores and the overall score card.
//!
//! Every score is a pure function of already-aggregated inputs. Fractional
//! results are truncated toward zero and clamped to `[0, 100]`. Missing data
//! yields [`NEUTRAL`] so that a failed query never reads as an alarm.

use crate::analyzers::grade::grade;
use crate::analyzers::segment::{top_of, total_of};
use crate::record::MetricSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Score used when the inputs are missing.
pub const NEUTRAL: u8 = 50;

/// Health dimension a score describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Engagement,
    TrafficDiversity,
    Mobile,
    Content,
    Growth,
    Retention,
    GeoDiversity,
}

impl Domain {
    pub const ALL: [Domain; 7] = [
        Domain::Engagement,
        Domain::TrafficDiversity,
        Domain::Mobile,
        Domain::Content,
        Domain::Growth,
        Domain::Retention,
        Domain::GeoDiversity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Domain::Engagement => "engagement",
            Domain::TrafficDiversity => "traffic_diversity",
            Domain::Mobile => "mobile",
            Domain::Content => "content",
            Domain::Growth => "growth",
            Domain::Retention => "retention",
            Domain::GeoDiversity => "geo_diversity",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Domain::Engagement => "Engagement",
            Domain::TrafficDiversity => "Traffic Diversity",
            Domain::Mobile => "Mobile",
            Domain::Content => "Content",
            Domain::Growth => "Growth",
            Domain::Retention => "Retention",
            Domain::GeoDiversity => "Geo Diversity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub domain: Domain,
    pub value: u8,
}

fn bounded(raw: f64) -> u8 {
    if raw.is_nan() {
        return NEUTRAL;
    }
    raw.trunc().clamp(0.0, 100.0) as u8
}

/// `rate*50 + min(duration/180, 1)*25 + min(pages_per_session/4, 1)*25`.
pub fn engagement(rate: f64, avg_session_duration: f64, pages_per_session: f64) -> u8 {
    let rate = rate.max(0.0);
    let duration = (avg_session_duration.max(0.0) / 180.0).min(1.0);
    let depth = (pages_per_session.max(0.0) / 4.0).min(1.0);
    bounded(rate * 50.0 + duration * 25.0 + depth * 25.0)
}

/// `(1 - top/total) * 100` over `metric`, [`NEUTRAL`] without traffic.
///
/// The top row is taken from a set sorted descending by `metric`; see
/// [`top_of`].
pub fn concentration(set: &MetricSet, metric: &str) -> u8 {
    let total = total_of(set, metric);
    match top_of(set, metric) {
        Some(top) if total > 0 => bounded((1.0 - top as f64 / total as f64) * 100.0),
        _ => NEUTRAL,
    }
}

/// [`concentration`] of channel sessions.
pub fn traffic_diversity(channels: &MetricSet) -> u8 {
    concentration(channels, "sessions")
}

/// [`concentration`] of country sessions.
pub fn geo_diversity(countries: &MetricSet) -> u8 {
    concentration(countries, "sessions")
}

/// DAU/MAU stickiness; 20% maps to 100.
pub fn retention(dau: i64, mau: i64) -> u8 {
    if mau <= 0 {
        return NEUTRAL;
    }
    bounded(dau.max(0) as f64 / mau as f64 * 500.0)
}

/// `50 + growth% `, saturating at +50% and flooring at -50%.
pub fn growth(current: f64, previous: f64) -> u8 {
    if previous > 0.0 {
        bounded(50.0 + (current - previous) / previous * 100.0)
    } else if current > 0.0 {
        75
    } else {
        NEUTRAL
    }
}

/// `100 - flagged/total*300`; a third of pages flagged drives it to 0.
pub fn content(flagged: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    bounded(100.0 - flagged as f64 / total as f64 * 300.0)
}

/// Target band on handheld share: 30–60% is ideal.
pub fn mobile(share: Option<f64>) -> u8 {
    match share {
        None => NEUTRAL,
        Some(s) if (0.30..=0.60).contains(&s) => 95,
        Some(s) if s > 0.15 => 75,
        Some(_) => 45,
    }
}

/// Aggregated inputs for [`score_all`]. `None` marks data that could not
/// be fetched.
#[derive(Debug, Clone, Default)]
pub struct ScoreInputs<'a> {
    /// Engagement rate, average session duration (s), pages per session.
    pub engagement: Option<(f64, f64, f64)>,
    pub channels: Option<&'a MetricSet>,
    /// Leave `None` to omit geo diversity from the card.
    pub countries: Option<&'a MetricSet>,
    pub dau: i64,
    pub mau: i64,
    /// Current and previous session totals.
    pub sessions: Option<(f64, f64)>,
    /// Flagged high-bounce pages and total pages.
    pub pages: Option<(usize, usize)>,
    pub mobile_share: Option<f64>,
}

/// Computes every score the inputs allow.
pub fn score_all(inputs: &ScoreInputs<'_>) -> ScoreCard {
    let mut card = ScoreCard::default();

    let engagement_score = inputs
        .engagement
        .map_or(NEUTRAL, |(rate, duration, pps)| engagement(rate, duration, pps));
    card.insert(Domain::Engagement, engagement_score);

    card.insert(
        Domain::TrafficDiversity,
        inputs.channels.map_or(NEUTRAL, traffic_diversity),
    );
    card.insert(Domain::Retention, retention(inputs.dau, inputs.mau));
    card.insert(
        Domain::Growth,
        inputs.sessions.map_or(NEUTRAL, |(c, p)| growth(c, p)),
    );
    card.insert(
        Domain::Content,
        inputs.pages.map_or(NEUTRAL, |(f, t)| content(f, t)),
    );
    card.insert(Domain::Mobile, mobile(inputs.mobile_share));

    if let Some(countries) = inputs.countries {
        card.insert(Domain::GeoDiversity, geo_diversity(countries));
    }

    card
}

/// Named collection of scores with a derived overall value and grade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScoreCard {
    scores: BTreeMap<Domain, u8>,
}

impl ScoreCard {
    pub fn insert(&mut self, domain: Domain, value: u8) {
        self.scores.insert(domain, value.min(100));
    }

    pub fn get(&self, domain: Domain) -> Option<u8> {
        self.scores.get(&domain).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Scores in [`Domain`] order.
    pub fn iter(&self) -> impl Iterator<Item = Score> + '_ {
        self.scores
            .iter()
            .map(|(&domain, &value)| Score { domain, value })
    }

    /// Floor of the unweighted mean of present scores, `0` when empty.
    pub fn overall(&self) -> u8 {
        if self.scores.is_empty() {
            return 0;
        }
        let sum: u32 = self.scores.values().map(|&v| v as u32).sum();
        (sum / self.scores.len() as u32) as u8
    }

    pub fn grade(&self) -> String {
        grade(self.overall())
    }
}
