//! HTTP client utilities.
//!
//! Builds the shared `reqwest` client used for all Dexcom Share calls.
//!
//! ## TLS verification is disabled on purpose
//!
//! The upstream Share service presents a certificate pinned to a hostname that
//! does not match every regional endpoint, so certificate validation is turned
//! off (`danger_accept_invalid_certs`), exactly as the legacy mobile client the
//! User-Agent impersonates does. Re-enabling validation breaks the EU endpoint;
//! anyone changing this trade-off should know they are changing the security
//! posture of every request this crate makes.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder};

use crate::error::{DexpollError, Result};

/// Per-request timeout for Share calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Identifies the legacy Dexcom mobile client the Share service expects.
pub const USER_AGENT: &str = "Dexcom Share/3.0.2.11 CFNetwork/711.2.23 Darwin/14.0.0";

/// Build the configured HTTP client.
///
/// # Errors
///
/// Returns [`DexpollError::ClientBuild`] if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|e| DexpollError::ClientBuild(e.to_string()))
}

/// Build a client with the standard Share timeout.
///
/// # Errors
///
/// Returns [`DexpollError::ClientBuild`] if client construction fails.
pub fn share_client() -> Result<Client> {
    build_client(REQUEST_TIMEOUT)
}
