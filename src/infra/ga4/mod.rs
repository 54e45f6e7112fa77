//! GA4 Data API adapter.
//!
//! [`Ga4Client`] implements [`ReportFetcher`](crate::services::report_api::ReportFetcher)
//! over any [`HttpClient`](crate::fetch::HttpClient), usually a
//! [`BasicClient`](crate::fetch::BasicClient) wrapped in a bearer
//! [`ApiKey`](crate::fetch::auth::ApiKey).

mod client;

pub use client::{Ga4Client, cohort_spec, report_body};
