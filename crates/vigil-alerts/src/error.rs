//! Error types for the vigil-alerts crate.

use thiserror::Error;

/// Errors that can occur in the alerting engine.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Invalid alert rule configuration.
    #[error("invalid alert rule: {reason}")]
    InvalidRule {
        /// The reason the rule is invalid.
        reason: String,
    },

    /// Invalid engine configuration (fatal at startup).
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// A channel name did not map to a registered channel kind.
    #[error("unknown channel: {name}")]
    UnknownChannel {
        /// The channel name that was not recognized.
        name: String,
    },

    /// Notification delivery failed.
    #[error("notification failed on {channel}: {reason}")]
    NotificationFailed {
        /// The channel that failed.
        channel: String,
        /// The reason the notification failed.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_rule() {
        let err = AlertError::InvalidRule {
            reason: "empty name".to_string(),
        };
        assert_eq!(err.to_string(), "invalid alert rule: empty name");
    }

    #[test]
    fn error_display_invalid_config() {
        let err = AlertError::InvalidConfig {
            reason: "bad maintenance window".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration: bad maintenance window"
        );
    }

    #[test]
    fn error_display_unknown_channel() {
        let err = AlertError::UnknownChannel {
            name: "carrier-pigeon".to_string(),
        };
        assert_eq!(err.to_string(), "unknown channel: carrier-pigeon");
    }

    #[test]
    fn error_display_notification_failed() {
        let err = AlertError::NotificationFailed {
            channel: "email".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "notification failed on email: connection refused"
        );
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid json");
        assert!(json_err.is_err());
        let alert_err: AlertError = json_err.unwrap_err().into();
        assert!(matches!(alert_err, AlertError::SerializationError(_)));
    }
}
