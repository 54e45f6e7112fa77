use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Request, Response};

/// Sends a prepared request. Auth wrappers such as
/// [`ApiKey`](super::auth::ApiKey) decorate a base client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Plain `reqwest` client with no authentication.
#[derive(Clone, Default)]
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that identifies itself with `user_agent` on every request.
    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let inner = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self(inner))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.0.execute(req).await
    }
}
