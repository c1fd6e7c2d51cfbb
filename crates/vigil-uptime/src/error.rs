//! Error types for the uptime crate.

use thiserror::Error;

/// Errors surfaced by the uptime monitor.
///
/// Probe failures are deliberately absent: a failed probe is a DOWN
/// [`crate::types::CheckResult`], never an error.
#[derive(Debug, Error)]
pub enum UptimeError {
    /// An endpoint definition failed validation.
    #[error("invalid endpoint: {reason}")]
    InvalidEndpoint {
        /// Why the endpoint was rejected.
        reason: String,
    },

    /// A query referenced an endpoint the monitor does not track.
    #[error("unknown endpoint '{name}'")]
    UnknownEndpoint {
        /// The requested endpoint name.
        name: String,
    },

    /// Serializing monitor state failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for UptimeError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, UptimeError>;
