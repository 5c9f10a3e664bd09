//! Retry orchestration and poll scheduling.

pub mod retry;
pub mod scheduler;

pub use retry::{DEFAULT_MAX_ATTEMPTS, fetch_with_retry};
pub use scheduler::{HistoryRequests, PollEvent, Poller, WATCHDOG_SECS};
