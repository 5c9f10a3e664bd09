//! Shared infrastructure: models, HTTP client, config, logging.

pub mod config;
pub mod http;
pub mod logging;
pub mod models;

pub use config::{Config, Region, Units};
pub use models::{ApiError, ApiErrorKind, ApiResponse, RawReading, Reading, Trend};
