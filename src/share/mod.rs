//! Dexcom Share session client with credential caching.
//!
//! The Share API wants a three-step dance: authenticate the publisher account
//! (yields an account UUID), log in with that UUID (yields a session UUID), then
//! fetch readings with the session. [`ShareClient`] caches both UUIDs so a warm
//! poll costs one round-trip, and invalidates exactly the entry implicated by a
//! failing step:
//!
//! - fetch rejected -> session cleared (expired), account kept
//! - login rejected -> account cleared (stale), full re-auth next time
//! - authenticate rejected -> nothing to clear
//!
//! [`ShareClient::fetch_cached`] is strictly single-attempt. Retry policy lives
//! in [`crate::poll::retry`]; blending the two would double the retry budget.
//!
//! The periodic poll and the on-demand history path share one client. The cache
//! mutex is only ever held for a field read or write, never across an await, so
//! concurrent paths interleave with last-write-wins semantics on the two cached
//! fields. That race is inherited from the upstream design and is harmless: the
//! loser of a race re-authenticates on its next attempt.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::core::http;
use crate::core::models::{ApiError, ApiResponse, RawReading, Reading};
use crate::error::Result;

/// Application id of the legacy mobile client the Share service accepts.
pub const APPLICATION_ID: &str = "d89443d2-327c-4a6f-89e5-496bbb0317db";

const AUTH_PATH: &str = "/ShareWebServices/Services/General/AuthenticatePublisherAccount";
const LOGIN_PATH: &str = "/ShareWebServices/Services/General/LoginPublisherAccountById";
const FETCH_PATH: &str = "/ShareWebServices/Services/Publisher/ReadPublisherLatestGlucoseValues";

/// Single-attempt fetch seam, implemented by [`ShareClient`] and by test fakes.
#[async_trait]
pub trait GlucoseFetch: Send + Sync {
    /// One attempt at fetching readings with the current cache state.
    async fn fetch_cached(&self, max_count: u32, minutes: u32) -> ApiResponse;
}

/// Snapshot of the credential cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheState {
    /// Account UUID; survives until a login using it is rejected.
    pub account_id: Option<String>,
    /// Session UUID; survives until a fetch using it is rejected.
    pub session_id: Option<String>,
}

/// Outcome of one HTTPS POST: either a response (any status) or a transport
/// failure that produced no response at all. Transport failures never feed
/// cache-invalidation decisions.
enum PostOutcome {
    Response { status: u16, body: String },
    Transport(String),
}

/// Stateful Share API client. See the module docs for the caching contract.
pub struct ShareClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
    cache: Mutex<CacheState>,
}

impl ShareClient {
    /// Client for a Share host (no scheme), e.g. `share1.dexcom.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(host: &str, username: &str, password: &str) -> Result<Self> {
        Ok(Self::with_base_url(
            format!("https://{host}"),
            username,
            password,
            http::share_client()?,
        ))
    }

    /// Client against an explicit base URL with a caller-supplied HTTP client.
    /// Used by tests and by hosts that proxy the Share service.
    #[must_use]
    pub fn with_base_url(
        base_url: String,
        username: &str,
        password: &str,
        http: Client,
    ) -> Self {
        Self {
            http,
            base_url,
            username: username.to_string(),
            password: password.to_string(),
            cache: Mutex::new(CacheState::default()),
        }
    }

    /// Current cache contents.
    #[must_use]
    pub fn cache_state(&self) -> CacheState {
        self.lock_cache().clone()
    }

    /// Replace the cache wholesale, e.g. to restore credentials an embedding
    /// host persisted across restarts.
    pub fn restore_cache(&self, state: CacheState) {
        *self.lock_cache() = state;
    }

    /// One fetch attempt routed by cache state: warm session -> fetch only;
    /// account only -> login then fetch; cold -> authenticate, login, fetch.
    pub async fn fetch_cached(&self, max_count: u32, minutes: u32) -> ApiResponse {
        let session_id = self.lock_cache().session_id.clone();
        if let Some(session_id) = session_id {
            debug!("using cached session");
            return self.fetch_with_session(&session_id, max_count, minutes).await;
        }

        let account_id = self.lock_cache().account_id.clone();
        if let Some(account_id) = account_id {
            debug!("using cached account id, need new session");
            return self.login_then_fetch(&account_id, max_count, minutes).await;
        }

        debug!("cold start, full authentication");
        self.authenticate_then_fetch(max_count, minutes).await
    }

    async fn authenticate_then_fetch(&self, max_count: u32, minutes: u32) -> ApiResponse {
        const STEP: &str = "Authenticate";
        let body = json!({
            "accountName": self.username,
            "password": self.password,
            "applicationId": APPLICATION_ID,
        });
        match self.post_json(AUTH_PATH, &body).await {
            PostOutcome::Transport(detail) => {
                ApiResponse::err(ApiError::transport(STEP, &detail))
            }
            PostOutcome::Response { status, body } if status != 200 => {
                // Nothing cached yet, nothing to invalidate.
                ApiResponse::err(ApiError::http(STEP, status, &body))
            }
            PostOutcome::Response { status, body } => match strip_quotes(&body) {
                None => ApiResponse::err(ApiError::protocol(
                    STEP,
                    status,
                    "invalid account id response",
                )),
                Some(account_id) => {
                    self.lock_cache().account_id = Some(account_id.to_string());
                    debug!("account id cached");
                    self.login_then_fetch(account_id, max_count, minutes).await
                }
            },
        }
    }

    async fn login_then_fetch(
        &self,
        account_id: &str,
        max_count: u32,
        minutes: u32,
    ) -> ApiResponse {
        const STEP: &str = "Login";
        let body = json!({
            "accountId": account_id,
            "password": self.password,
            "applicationId": APPLICATION_ID,
        });
        match self.post_json(LOGIN_PATH, &body).await {
            PostOutcome::Transport(detail) => {
                ApiResponse::err(ApiError::transport(STEP, &detail))
            }
            PostOutcome::Response { status, body } if status != 200 => {
                // The cached account id may be stale; next attempt re-auths.
                warn!(status, "login failed, clearing account id");
                self.lock_cache().account_id = None;
                ApiResponse::err(ApiError::http(STEP, status, &body))
            }
            PostOutcome::Response { status, body } => match strip_quotes(&body) {
                None => ApiResponse::err(ApiError::protocol(
                    STEP,
                    status,
                    "invalid session response",
                )),
                Some(session_id) => {
                    self.lock_cache().session_id = Some(session_id.to_string());
                    debug!("session obtained");
                    self.fetch_with_session(session_id, max_count, minutes).await
                }
            },
        }
    }

    async fn fetch_with_session(
        &self,
        session_id: &str,
        max_count: u32,
        minutes: u32,
    ) -> ApiResponse {
        const STEP: &str = "Fetch readings";
        let query = [
            ("sessionID", session_id.to_string()),
            ("minutes", minutes.max(1).to_string()),
            ("maxCount", max_count.max(1).to_string()),
        ];
        match self.post_query(FETCH_PATH, &query).await {
            PostOutcome::Transport(detail) => {
                ApiResponse::err(ApiError::transport(STEP, &detail))
            }
            PostOutcome::Response { status, body } if status != 200 => {
                // Session expired or rejected; next attempt logs in again.
                warn!(status, "fetch failed, clearing session");
                self.lock_cache().session_id = None;
                ApiResponse::err(ApiError::http(STEP, status, &body))
            }
            PostOutcome::Response { status, body } => {
                match serde_json::from_str::<Vec<RawReading>>(&body) {
                    Ok(raw) => {
                        ApiResponse::ok(raw.iter().map(Reading::from_raw).collect())
                    }
                    // A 200 with an unreadable body is a protocol error; the
                    // session itself may still be fine, so the cache stays.
                    Err(e) => ApiResponse::err(ApiError::protocol(
                        "Parse readings",
                        status,
                        &e.to_string(),
                    )),
                }
            }
        }
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> PostOutcome {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");
        Self::outcome(self.http.post(&url).json(body).send().await).await
    }

    async fn post_query(&self, path: &str, query: &[(&str, String)]) -> PostOutcome {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");
        Self::outcome(self.http.post(&url).query(query).send().await).await
    }

    async fn outcome(
        sent: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> PostOutcome {
        match sent {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => PostOutcome::Response { status, body },
                    Err(e) => PostOutcome::Transport(e.to_string()),
                }
            }
            Err(e) => PostOutcome::Transport(e.to_string()),
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // A poisoned lock only means another task panicked mid-write of a
        // String field; the cache is still usable.
        self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl GlucoseFetch for ShareClient {
    async fn fetch_cached(&self, max_count: u32, minutes: u32) -> ApiResponse {
        Self::fetch_cached(self, max_count, minutes).await
    }
}

/// The auth and login endpoints return a bare quoted UUID. Strip the quotes;
/// anything shorter than two characters, not quote-delimited, or empty once
/// stripped is malformed.
fn strip_quotes(body: &str) -> Option<&str> {
    body.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|stripped| !stripped.is_empty())
}
