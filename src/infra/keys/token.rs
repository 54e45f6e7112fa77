use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding a bearer access token.
pub const TOKEN_ENV: &str = "GA_ACCESS_TOKEN";

/// Environment variable overriding the token file location.
pub const TOKEN_PATH_ENV: &str = "GA_TOKEN_PATH";

/// Token file as written by common OAuth helpers:
///
/// ```json
/// { "token": "ya29...", "refresh_token": "...", "expiry": "..." }
/// ```
///
/// Only the access token is read.
#[derive(Deserialize)]
struct TokenFile {
    #[serde(alias = "access_token")]
    token: String,
}

/// `$GA_TOKEN_PATH`, else `~/.config/ga-deep-dive/token.json`.
pub fn default_token_path(path_env: Option<String>, home: Option<PathBuf>) -> PathBuf {
    if let Some(path) = path_env.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }
    home.unwrap_or_default()
        .join(".config")
        .join("ga-deep-dive")
        .join("token.json")
}

/// Picks the token from `env_token` when set, otherwise from the file at
/// `path`.
///
/// # Errors
///
/// Fails when neither source yields a non-empty token.
pub fn resolve_access_token(env_token: Option<String>, path: &Path) -> Result<String> {
    if let Some(token) = env_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        return Ok(token);
    }

    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "No access token: set {TOKEN_ENV} or create {}",
            path.display()
        )
    })?;
    let file: TokenFile = serde_json::from_str(&content)
        .with_context(|| format!("Invalid token file {}", path.display()))?;

    let token = file.token.trim();
    if token.is_empty() {
        bail!("Token file {} has an empty token", path.display());
    }
    Ok(token.to_string())
}
