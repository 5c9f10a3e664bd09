//! Error types for dexpoll.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! Only crate-level operations (loading configuration, constructing the HTTP
//! client, event delivery) surface as [`DexpollError`]. Failures of individual
//! Dexcom fetches are *values*, not errors: they travel inside
//! [`crate::core::models::ApiResponse`] so the polling loop can keep running.

use thiserror::Error;

/// Exit codes for the `dexpoll` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Configuration missing or invalid
    ConfigError = 2,
    /// A one-shot fetch ended in an error response
    FetchError = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Main error type for dexpoll operations.
#[derive(Error, Debug)]
pub enum DexpollError {
    /// Configuration file not found at expected path.
    #[error("config file not found: {path}")]
    ConfigNotFound { path: String },

    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid { key: String, message: String },

    /// HTTP client construction failed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The event channel was closed by the receiver.
    #[error("event channel closed")]
    ChannelClosed,

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DexpollError {
    /// Map error to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. } => ExitCode::ConfigError,
            Self::ClientBuild(_)
            | Self::ChannelClosed
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }
}

/// Result type alias for dexpoll operations.
pub type Result<T> = std::result::Result<T, DexpollError>;
