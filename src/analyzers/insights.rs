//! Turns a score card and a few aggregated facts into ordered recommendations.

use crate::analyzers::scoring::{Domain, ScoreCard};

/// Quality score above which a country is worth localizing for.
pub const LOCALIZATION_QUALITY: f64 = 2.0;

/// Facts the rules need beyond the scores themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsightContext {
    /// Leading channel name and its share of sessions (0..=1).
    pub top_channel: Option<(String, f64)>,
    pub dau: i64,
    pub mau: i64,
    /// Worst flagged page path and its bounce rate (0..=1).
    pub worst_page: Option<(String, f64)>,
    /// Highest quality country and its quality score.
    pub best_country: Option<(String, f64)>,
    /// `None` when campaign data could not be fetched.
    pub has_campaigns: Option<bool>,
}

fn below(card: &ScoreCard, domain: Domain, limit: u8) -> bool {
    card.get(domain).is_some_and(|v| v < limit)
}

fn above(card: &ScoreCard, domain: Domain, limit: u8) -> bool {
    card.get(domain).is_some_and(|v| v > limit)
}

/// Recommendations in fixed rule order, at most one line per rule.
pub fn generate(card: &ScoreCard, ctx: &InsightContext) -> Vec<String> {
    let mut insights = Vec::new();

    if below(card, Domain::TrafficDiversity, 50) {
        if let Some((channel, share)) = &ctx.top_channel {
            insights.push(format!(
                "{:.0}% of traffic from {channel}; diversify acquisition (SEO content, social, newsletter, partnerships)",
                share * 100.0
            ));
        }
    }

    if below(card, Domain::Retention, 50) {
        let stickiness = if ctx.mau > 0 {
            ctx.dau as f64 / ctx.mau as f64 * 100.0
        } else {
            0.0
        };
        insights.push(format!(
            "Low retention (DAU/MAU={stickiness:.1}%); users are not returning, try re-engagement email or feature announcements"
        ));
    }

    if let Some((path, bounce)) = &ctx.worst_page {
        insights.push(format!(
            "Fix {path}: {:.1}% bounce rate; check load speed, content relevance and mobile layout",
            bounce * 100.0
        ));
    }

    if above(card, Domain::Growth, 70) {
        insights.push("Strong growth; double down on what is working".to_string());
    } else if below(card, Domain::Growth, 40) {
        insights.push("Traffic declining; investigate the cause".to_string());
    }

    if below(card, Domain::Mobile, 50) {
        insights.push("Low mobile traffic; check the mobile experience".to_string());
    }

    if let Some((country, quality)) = &ctx.best_country {
        if *quality > LOCALIZATION_QUALITY {
            insights.push(format!(
                "{country} sends the highest quality traffic; consider localization"
            ));
        }
    }

    if ctx.has_campaigns == Some(false) {
        insights.push("No tracked campaigns; add UTM parameters to shared links".to_string());
    }

    insights
}
