mod client;
pub mod auth;

pub use client::{BasicClient, HttpClient};

use anyhow::{Result, bail};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;

/// POSTs `body` as JSON and returns the raw response bytes.
///
/// Non-2xx responses are errors carrying the status and the response text.
pub async fn post_json<C, B>(client: &C, url: &str, body: &B) -> Result<Vec<u8>>
where
    C: HttpClient + ?Sized,
    B: Serialize + ?Sized,
{
    let mut req = reqwest::Request::new(reqwest::Method::POST, url.parse()?);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());

    let resp = client.execute(req).await?;
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        bail!("HTTP {status}: {}", String::from_utf8_lossy(&bytes).trim());
    }
    Ok(bytes.to_vec())
}
