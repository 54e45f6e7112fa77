//! Access-token lookup.
//!
//! The token is pre-issued; this crate never runs an OAuth flow or refreshes it.

mod token;

pub use token::{TOKEN_ENV, TOKEN_PATH_ENV, default_token_path, resolve_access_token};
