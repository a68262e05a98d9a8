use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod report;
pub mod settings;
pub mod status;
pub mod worker;

pub use report::Report;
pub use settings::{Limits, Settings};
pub use status::{LatencyBucket, StatusClass};
pub use worker::WorkerState;

/// Path the status report is mounted at.
pub const STATUS_PATH: &str = "/server-status-text";

/// Error types for RtStatus operations
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RtStatusError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Malformed report: {0}")]
    MalformedReport(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// JSON error envelope returned by the server for all error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Result type for RtStatus operations
pub type Result<T> = std::result::Result<T, RtStatusError>;
