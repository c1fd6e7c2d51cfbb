//! Environment-style configuration for the alerting service.
//!
//! Configuration is read from an env-shaped key/value map so tests can
//! drive it without touching the process environment. Malformed values
//! are fatal at startup; a silently ignored typo in a maintenance
//! window would mean silently dropped alerts.

use std::collections::HashMap;
use std::time::Duration;

use crate::channels::ChannelKind;
use crate::error::{AlertError, Result};
use crate::escalation::EscalationConfig;
use crate::suppression::{MaintenanceWindow, SuppressionPolicy};

/// Default per-channel dispatch timeout in seconds.
const DEFAULT_CHANNEL_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for [`crate::service::AlertingService`].
///
/// Channel enablement flags record operator intent; actual channel
/// wiring (SDK clients, credentials) is the caller's responsibility.
#[derive(Debug, Clone)]
pub struct AlertingConfig {
    /// Escalation timer settings.
    pub escalation: EscalationConfig,
    /// Optional daily window during which dispatch is suppressed.
    pub maintenance_window: Option<MaintenanceWindow>,
    /// Start with explicit maintenance mode on.
    pub maintenance_mode: bool,
    /// Start with the deployment-in-progress gate closed.
    pub deployment_in_progress: bool,
    /// Floor applied to per-rule cooldowns, in minutes.
    pub min_cooldown_minutes: u64,
    /// Per-channel dispatch timeout.
    pub channel_timeout: Duration,
    /// Operator enablement flags per channel kind; the service skips
    /// disabled kinds at dispatch.
    pub channel_flags: HashMap<ChannelKind, bool>,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            escalation: EscalationConfig::default(),
            maintenance_window: None,
            maintenance_mode: false,
            deployment_in_progress: false,
            min_cooldown_minutes: 0,
            channel_timeout: Duration::from_secs(DEFAULT_CHANNEL_TIMEOUT_SECS),
            channel_flags: HashMap::new(),
        }
    }
}

impl AlertingConfig {
    /// Builds configuration from an env-shaped map.
    ///
    /// Unrecognized keys are ignored so the map can carry unrelated
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` for any malformed value.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = map.get("VIGIL_ESCALATION_ENABLED") {
            config.escalation.enabled = parse_bool("VIGIL_ESCALATION_ENABLED", v)?;
        }
        if let Some(v) = map.get("VIGIL_ESCALATION_MINUTES") {
            config.escalation.default_minutes = parse_u64("VIGIL_ESCALATION_MINUTES", v)?;
        }
        if let Some(v) = map.get("VIGIL_MAX_ESCALATIONS") {
            config.escalation.max_escalations =
                u32::try_from(parse_u64("VIGIL_MAX_ESCALATIONS", v)?).map_err(|_| {
                    AlertError::InvalidConfig {
                        reason: format!("VIGIL_MAX_ESCALATIONS '{v}' out of range"),
                    }
                })?;
        }
        if let Some(v) = map.get("VIGIL_MAINTENANCE_WINDOW") {
            config.maintenance_window = Some(MaintenanceWindow::parse(v)?);
        }
        if let Some(v) = map.get("VIGIL_MAINTENANCE_MODE") {
            config.maintenance_mode = parse_bool("VIGIL_MAINTENANCE_MODE", v)?;
        }
        if let Some(v) = map.get("VIGIL_DEPLOY_IN_PROGRESS") {
            config.deployment_in_progress = parse_bool("VIGIL_DEPLOY_IN_PROGRESS", v)?;
        }
        if let Some(v) = map.get("VIGIL_COOLDOWN_MINUTES") {
            config.min_cooldown_minutes = parse_u64("VIGIL_COOLDOWN_MINUTES", v)?;
        }
        if let Some(v) = map.get("VIGIL_CHANNEL_TIMEOUT_SECS") {
            config.channel_timeout =
                Duration::from_secs(parse_u64("VIGIL_CHANNEL_TIMEOUT_SECS", v)?);
        }

        for kind in ChannelKind::all() {
            let key = format!("VIGIL_CHANNEL_{}", kind.as_str().to_uppercase());
            if let Some(v) = map.get(&key) {
                config.channel_flags.insert(kind, parse_bool(&key, v)?);
            }
        }

        Ok(config)
    }

    /// Builds configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` for any malformed value.
    pub fn from_env() -> Result<Self> {
        let map: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&map)
    }

    /// Builds the suppression policy this configuration describes.
    #[must_use]
    pub fn suppression_policy(&self) -> SuppressionPolicy {
        let policy = match self.maintenance_window {
            Some(window) => SuppressionPolicy::new().with_window(window),
            None => SuppressionPolicy::new(),
        };
        policy.set_maintenance_mode(self.maintenance_mode);
        policy.set_deployment_in_progress(self.deployment_in_progress);
        policy
    }

    /// Returns true if the operator has enabled the channel kind.
    ///
    /// Kinds without an explicit flag default to enabled.
    #[must_use]
    pub fn channel_enabled(&self, kind: ChannelKind) -> bool {
        self.channel_flags.get(&kind).copied().unwrap_or(true)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AlertError::InvalidConfig {
            reason: format!("{key} '{value}' is not a boolean"),
        }),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| AlertError::InvalidConfig {
        reason: format!("{key} '{value}' is not a non-negative integer"),
    })
}
