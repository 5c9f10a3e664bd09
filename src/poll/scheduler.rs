//! Poll scheduler with watchdog, plus the on-demand history path.
//!
//! One [`Poller`] drives a fetch cycle per interval. Each cycle spawns the
//! retry orchestrator as its own task and races the join handle against a
//! watchdog sleep; whichever side wins is the cycle's one and only emission.
//! When the watchdog wins, the fetch task is abandoned, not aborted: it runs
//! to completion in the background and its result is dropped, so a late
//! arrival can never produce a second emission. A panic inside the fetch task
//! surfaces as a join error and becomes an error event. Every path ends in
//! "emit, schedule next cycle" -- polling never stops.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::core::models::{ApiError, ApiResponse};
use crate::poll::retry::{self, DEFAULT_MAX_ATTEMPTS};
use crate::share::GlucoseFetch;

/// Wall-clock bound on one fetch cycle. Chosen to exceed the worst case of
/// 3 attempts x 20 s per-request timeout plus ~7 s of cumulative backoff.
pub const WATCHDOG_SECS: u64 = 70;

/// The periodic poll asks for the single latest reading within this window.
pub const POLL_WINDOW_MINUTES: u32 = 1440;

/// The Share service produces roughly one reading per five minutes; history
/// sizing derives its `maxCount` from this.
pub const READING_INTERVAL_MINUTES: u32 = 5;

/// Event stream delivered to the dashboard host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PollEvent {
    /// Terminal outcome of a periodic poll cycle.
    #[serde(rename_all = "camelCase")]
    Poll {
        #[serde(flatten)]
        response: ApiResponse,
    },
    /// Outcome of an on-demand history request.
    #[serde(rename_all = "camelCase")]
    History {
        #[serde(flatten)]
        response: ApiResponse,
        request_id: u64,
    },
}

/// Issues history request ids and decides which responses are still current.
///
/// Ids are monotonically increasing; a response whose id no longer matches the
/// most recently issued id lost the race to a newer request and is discarded
/// before emission, so out-of-order completions never reach the renderer.
#[derive(Debug, Default)]
pub struct HistoryRequests {
    last_issued: AtomicU64,
}

impl HistoryRequests {
    /// Issue the next request id.
    pub fn issue(&self) -> u64 {
        self.last_issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `request_id` is the most recently issued id.
    pub fn is_current(&self, request_id: u64) -> bool {
        self.last_issued.load(Ordering::SeqCst) == request_id
    }
}

/// Drives periodic fetch cycles and serves on-demand history requests, both
/// through the same shared fetcher (and therefore the same credential cache).
pub struct Poller<F: GlucoseFetch + 'static> {
    fetcher: Arc<F>,
    update_secs: u64,
    tx: mpsc::Sender<PollEvent>,
    history: Arc<HistoryRequests>,
}

impl<F: GlucoseFetch + 'static> Poller<F> {
    #[must_use]
    pub fn new(fetcher: Arc<F>, update_secs: u64, tx: mpsc::Sender<PollEvent>) -> Self {
        Self {
            fetcher,
            update_secs,
            tx,
            history: Arc::new(HistoryRequests::default()),
        }
    }

    /// Run the poll loop until the event receiver is dropped.
    ///
    /// Each cycle's terminal outcome (readings, retry-exhausted error, watchdog
    /// timeout, or panic converted to an error) is emitted exactly once, and
    /// the next cycle starts `update_secs` after the start of this one --
    /// later if the cycle overran the interval, since cycles never overlap.
    pub async fn run(&self) {
        info!(update_secs = self.update_secs, "starting poll loop");
        loop {
            let cycle_start = Instant::now();
            let response = self.run_cycle().await;
            if self.tx.send(PollEvent::Poll { response }).await.is_err() {
                debug!("event receiver dropped, stopping poll loop");
                return;
            }
            tokio::time::sleep_until(cycle_start + Duration::from_secs(self.update_secs))
                .await;
        }
    }

    /// One fetch cycle: retry orchestrator raced against the watchdog.
    async fn run_cycle(&self) -> ApiResponse {
        let fetcher = Arc::clone(&self.fetcher);
        let mut fetch_task = tokio::spawn(async move {
            retry::fetch_with_retry(
                fetcher.as_ref(),
                1,
                POLL_WINDOW_MINUTES,
                DEFAULT_MAX_ATTEMPTS,
            )
            .await
        });

        tokio::select! {
            joined = &mut fetch_task => match joined {
                Ok(response) => response,
                Err(join_error) => {
                    error!(%join_error, "fetch cycle task failed");
                    ApiResponse::err(ApiError::transport(
                        "Fetch cycle",
                        &join_error.to_string(),
                    ))
                }
            },
            () = tokio::time::sleep(Duration::from_secs(WATCHDOG_SECS)) => {
                error!(
                    watchdog_secs = WATCHDOG_SECS,
                    "fetch cycle exceeded watchdog, emitting timeout"
                );
                // fetch_task is dropped, not aborted: it keeps running and its
                // eventual result is discarded.
                ApiResponse::err(ApiError::timeout(WATCHDOG_SECS))
            }
        }
    }

    /// Request a history window. Returns the issued request id; the response
    /// arrives as a [`PollEvent::History`] unless a newer request supersedes
    /// it first. Runs concurrently with the periodic poll, sharing the
    /// credential cache (last-write-wins, see the `share` module docs).
    pub fn request_history(&self, minutes: u32) -> u64 {
        let request_id = self.history.issue();
        let fetcher = Arc::clone(&self.fetcher);
        let tracker = Arc::clone(&self.history);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let max_count = minutes.div_ceil(READING_INTERVAL_MINUTES) + 1;
            let response = retry::fetch_with_retry(
                fetcher.as_ref(),
                max_count,
                minutes,
                DEFAULT_MAX_ATTEMPTS,
            )
            .await;

            if !tracker.is_current(request_id) {
                debug!(request_id, "stale history response discarded");
                return;
            }
            if tx
                .send(PollEvent::History {
                    response,
                    request_id,
                })
                .await
                .is_err()
            {
                debug!(request_id, "event receiver dropped, history response lost");
            }
        });

        request_id
    }
}
