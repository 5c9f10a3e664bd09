//! Bounded retry with exponential backoff around a single-attempt fetcher.
//!
//! Intermediate failures are logged and swallowed; only the terminal outcome
//! (first success, or the final attempt's failure) reaches the caller, so the
//! UI never flickers on a transient error.

use std::time::Duration;

use tracing::{error, warn};

use crate::core::models::ApiResponse;
use crate::share::GlucoseFetch;

/// Attempt budget per fetch cycle.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Run up to `max_attempts` fetch attempts, sleeping `2^(attempt-1)` seconds
/// between failures (1 s, 2 s, 4 s, ...). No sleep follows the final attempt.
pub async fn fetch_with_retry<F>(
    fetcher: &F,
    max_count: u32,
    minutes: u32,
    max_attempts: u32,
) -> ApiResponse
where
    F: GlucoseFetch + ?Sized,
{
    let mut attempt: u32 = 1;
    loop {
        let response = fetcher.fetch_cached(max_count, minutes).await;
        let Some(api_error) = response.error.as_ref() else {
            return response;
        };

        if attempt >= max_attempts {
            error!(
                attempts = max_attempts,
                error = %api_error.message,
                "all fetch attempts failed"
            );
            return response;
        }

        let delay = Duration::from_secs(1 << (attempt - 1));
        warn!(
            attempt,
            max_attempts,
            error = %api_error.message,
            delay_secs = delay.as_secs(),
            "fetch attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
