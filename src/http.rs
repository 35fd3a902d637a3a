//! Shared HTTP client for the remote cross-encoder.
//!
//! Provides a configured [`reqwest::Client`] and maps transport errors onto
//! [`RerankError`] so callers can tell a soft outage from a hard failure.

use crate::config::RemoteConfig;
use crate::error::RerankError;

/// User-Agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for remote scoring requests.
///
/// The client has the per-request timeout from config and the configured
/// User-Agent (or [`DEFAULT_USER_AGENT`]).
///
/// # Errors
///
/// Returns [`RerankError::Http`] if the client cannot be constructed.
pub fn build_client(config: &RemoteConfig) -> Result<reqwest::Client, RerankError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(ua)
        .build()
        .map_err(|e| RerankError::Http(format!("failed to build HTTP client: {e}")))
}

/// Map a transport error to the matching [`RerankError`] variant.
///
/// Timeouts and refused connections are soft failures; anything else is a
/// hard HTTP error.
pub fn classify_reqwest_error(err: &reqwest::Error) -> RerankError {
    if err.is_timeout() {
        RerankError::RemoteTimeout(err.to_string())
    } else if err.is_connect() {
        RerankError::RemoteUnavailable(format!("connection failed: {err}"))
    } else {
        RerankError::Http(format!("transport error: {err}"))
    }
}
