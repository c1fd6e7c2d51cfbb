//! Notification channels for alert delivery.
//!
//! Concrete transports (SMTP, chat webhooks, pager APIs, SMS gateways)
//! are external collaborators; this crate only requires the
//! [`NotificationChannel`] capability and its succeed-or-fail-within-
//! timeout contract. Channels are registered once at startup in a
//! [`ChannelRegistry`] keyed by the closed [`ChannelKind`] enum;
//! looking up an unregistered kind is an explicit error, never a
//! silent no-op.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{AlertError, Result};
use crate::types::{Alert, AlertSeverity};

/// The closed set of delivery media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Email delivery (SMTP collaborator).
    Email,
    /// Chat message (webhook collaborator).
    Chat,
    /// Paging service (on-call API collaborator).
    Pager,
    /// SMS delivery (gateway collaborator).
    Sms,
}

impl ChannelKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Chat => "chat",
            Self::Pager => "pager",
            Self::Sms => "sms",
        }
    }

    /// All known kinds.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Email, Self::Chat, Self::Pager, Self::Sms]
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "chat" => Ok(Self::Chat),
            "pager" => Ok(Self::Pager),
            "sms" => Ok(Self::Sms),
            _ => Err(AlertError::UnknownChannel {
                name: s.to_string(),
            }),
        }
    }
}

/// Capability for delivering one alert through one medium.
///
/// Implementations must complete (successfully or not) within the
/// dispatcher's per-channel timeout and must express failure as an
/// error value; nothing may escape the `send` boundary.
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    /// Returns the configured name of this channel instance.
    fn name(&self) -> &str;

    /// Returns the delivery medium this channel serves.
    fn kind(&self) -> ChannelKind;

    /// Delivers one alert.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotificationFailed` when delivery fails.
    fn send<'a>(&'a self, alert: &'a Alert) -> BoxFuture<'a, Result<()>>;

    /// Checks reachability of the underlying transport.
    fn test_connectivity(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }

    /// Returns true if this channel is enabled.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Registry of channels, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    channels: HashMap<ChannelKind, Arc<dyn NotificationChannel>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel for its kind, replacing any previous one.
    pub fn register(&mut self, channel: Arc<dyn NotificationChannel>) {
        info!(channel = %channel.name(), kind = %channel.kind(), "registered notification channel");
        self.channels.insert(channel.kind(), channel);
    }

    /// Looks up the channel for a kind.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::UnknownChannel` if no channel is registered
    /// for `kind`.
    pub fn get(&self, kind: ChannelKind) -> Result<Arc<dyn NotificationChannel>> {
        self.channels
            .get(&kind)
            .cloned()
            .ok_or_else(|| AlertError::UnknownChannel {
                name: kind.as_str().to_string(),
            })
    }

    /// Kinds with an enabled channel registered.
    #[must_use]
    pub fn enabled_kinds(&self) -> Vec<ChannelKind> {
        let mut kinds: Vec<_> = self
            .channels
            .iter()
            .filter(|(_, c)| c.is_enabled())
            .map(|(k, _)| *k)
            .collect();
        kinds.sort_unstable();
        kinds
    }

    /// Number of registered channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if no channel is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// A tracing-backed channel for local and development use.
///
/// Firing alerts are logged at error level so they stand out in
/// aggregated logs; lower severities log at info.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
    kind: ChannelKind,
    enabled: bool,
}

impl LogChannel {
    /// Creates a log channel serving the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: true,
        }
    }

    /// Sets whether the channel is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn send<'a>(&'a self, alert: &'a Alert) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if alert.severity >= AlertSeverity::Critical {
                error!(
                    alert_id = %alert.id,
                    title = %alert.title,
                    severity = %alert.severity,
                    source = %alert.source,
                    category = %alert.category,
                    "ALERT"
                );
            } else {
                info!(
                    alert_id = %alert.id,
                    title = %alert.title,
                    severity = %alert.severity,
                    "ALERT"
                );
            }
            Ok(())
        })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertEvent;

    fn test_alert() -> Alert {
        Alert::from_event(&AlertEvent::new(
            "API down",
            AlertSeverity::Critical,
            "uptime",
            "api",
        ))
    }

    mod kind_tests {
        use super::*;
        use test_case::test_case;

        #[test_case("email", ChannelKind::Email)]
        #[test_case("chat", ChannelKind::Chat)]
        #[test_case("PAGER", ChannelKind::Pager)]
        #[test_case("Sms", ChannelKind::Sms)]
        fn parses_known_names(input: &str, expected: ChannelKind) {
            assert_eq!(input.parse::<ChannelKind>().unwrap(), expected);
        }

        #[test]
        fn unknown_name_is_explicit_error() {
            let result = "carrier-pigeon".parse::<ChannelKind>();
            assert!(matches!(
                result,
                Err(AlertError::UnknownChannel { name }) if name == "carrier-pigeon"
            ));
        }

        #[test]
        fn as_str_roundtrip() {
            for kind in ChannelKind::all() {
                assert_eq!(kind.as_str().parse::<ChannelKind>().unwrap(), kind);
            }
        }

        #[test]
        fn serde_lowercase() {
            let json = serde_json::to_string(&ChannelKind::Pager).unwrap();
            assert_eq!(json, "\"pager\"");
        }
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn register_and_get() {
            let mut registry = ChannelRegistry::new();
            registry.register(Arc::new(LogChannel::new("log-email", ChannelKind::Email)));

            assert_eq!(registry.len(), 1);
            let channel = registry.get(ChannelKind::Email).unwrap();
            assert_eq!(channel.name(), "log-email");
        }

        #[test]
        fn get_unregistered_kind_fails() {
            let registry = ChannelRegistry::new();
            let result = registry.get(ChannelKind::Sms);
            assert!(matches!(
                result,
                Err(AlertError::UnknownChannel { name }) if name == "sms"
            ));
        }

        #[test]
        fn register_replaces_previous() {
            let mut registry = ChannelRegistry::new();
            registry.register(Arc::new(LogChannel::new("first", ChannelKind::Chat)));
            registry.register(Arc::new(LogChannel::new("second", ChannelKind::Chat)));

            assert_eq!(registry.len(), 1);
            assert_eq!(registry.get(ChannelKind::Chat).unwrap().name(), "second");
        }

        #[test]
        fn enabled_kinds_skips_disabled() {
            let mut registry = ChannelRegistry::new();
            registry.register(Arc::new(LogChannel::new("email", ChannelKind::Email)));
            registry.register(Arc::new(
                LogChannel::new("sms", ChannelKind::Sms).enabled(false),
            ));

            assert_eq!(registry.enabled_kinds(), vec![ChannelKind::Email]);
        }
    }

    mod log_channel_tests {
        use super::*;

        #[tokio::test]
        async fn send_succeeds() {
            let channel = LogChannel::new("log", ChannelKind::Chat);
            let alert = test_alert();
            assert!(channel.send(&alert).await.is_ok());
        }

        #[tokio::test]
        async fn connectivity_defaults_to_true() {
            let channel = LogChannel::new("log", ChannelKind::Chat);
            assert!(channel.test_connectivity().await);
        }

        #[test]
        fn disabled_flag() {
            let channel = LogChannel::new("log", ChannelKind::Chat).enabled(false);
            assert!(!channel.is_enabled());
        }
    }
}
