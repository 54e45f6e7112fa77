//! Report configuration loaded from an optional JSON file.
//!
//! ```json
//! {
//!   "properties": { "solvr": "523300499" },
//!   "content_rules": [{ "prefix": "/agents", "group": "agents" }],
//!   "internal_domain": "solvr.dev",
//!   "fetch_timeout_secs": 30
//! }
//! ```
//!
//! Every field is optional and falls back to [`ReportConfig::default`].

use crate::analyzers::segment::{ContentRule, default_content_rules};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://analyticsdata.googleapis.com";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Friendly name to numeric property id.
    pub properties: BTreeMap<String, String>,
    pub content_rules: Vec<ContentRule>,
    /// Links to this domain are not counted as outbound.
    pub internal_domain: Option<String>,
    pub fetch_timeout_secs: u64,
    pub high_bounce_threshold: f64,
    pub high_bounce_min_views: f64,
    pub include_geo_diversity: bool,
    pub api_base_url: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            properties: BTreeMap::new(),
            content_rules: default_content_rules(),
            internal_domain: None,
            fetch_timeout_secs: 30,
            high_bounce_threshold: 0.6,
            high_bounce_min_views: 3.0,
            include_geo_diversity: true,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl ReportConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Maps a configured property name (case-insensitive) to its id. A purely
    /// numeric argument is taken as an id.
    pub fn resolve_property(&self, name_or_id: &str) -> Result<String> {
        let wanted = name_or_id.trim();
        if let Some(id) = self
            .properties
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, id)| id)
        {
            return Ok(id.clone());
        }
        if !wanted.is_empty() && wanted.chars().all(|c| c.is_ascii_digit()) {
            return Ok(wanted.to_string());
        }
        bail!("Unknown property '{name_or_id}'; pass a numeric property id or add it to the config")
    }

    /// Iterates over all `(name, id)` pairs.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
