//! Shared HTTP client for JSON record backends.

use std::time::Duration;

use crate::error::SourceError;

/// User-Agent sent when the caller does not configure one.
pub const DEFAULT_USER_AGENT: &str = concat!("pantry-search/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for backend queries.
///
/// The client has:
/// - a request timeout (the aggregator applies its own per-source timeout
///   on top; this one bounds a single HTTP exchange)
/// - the given User-Agent, or [`DEFAULT_USER_AGENT`]
/// - gzip decompression
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the client cannot be constructed.
pub fn build_client(
    timeout: Duration,
    user_agent: Option<&str>,
) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| SourceError::Http(format!("failed to build HTTP client: {e}")))
}
