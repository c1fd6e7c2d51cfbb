//! Core types for the alerting engine.
//!
//! This module provides the fundamental types used throughout the
//! vigil-alerts crate:
//! - [`AlertSeverity`]: the severity level of a signal or alert
//! - [`AlertStatus`]: the lifecycle state of a persisted alert
//! - [`AlertEvent`]: an ephemeral signal submitted by an evaluator
//! - [`Alert`]: the persisted, actionable record derived from an event

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The severity level of an alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational alert, no action required.
    Info,
    /// Warning alert, should be investigated.
    #[default]
    Warning,
    /// Critical alert, requires immediate attention.
    Critical,
    /// Emergency alert, all hands; produced by escalating a critical.
    Emergency,
}

impl AlertSeverity {
    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Emergency => "emergency",
        }
    }

    /// Returns the priority of this severity (higher = more urgent).
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Warning => 2,
            Self::Critical => 3,
            Self::Emergency => 4,
        }
    }

    /// Returns the severity an escalated alert is bumped to.
    ///
    /// Critical escalates to Emergency; everything else escalates to
    /// Critical. Emergency stays at Emergency.
    #[must_use]
    pub const fn escalated(&self) -> Self {
        match self {
            Self::Info | Self::Warning => Self::Critical,
            Self::Critical | Self::Emergency => Self::Emergency,
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The lifecycle state of a persisted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// The alert is open and unhandled.
    Active,
    /// An operator has acknowledged the alert; escalation is cancelled.
    Acknowledged,
    /// The alert is closed and moved to history.
    Resolved,
}

impl AlertStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }

    /// Returns true if the alert still lives in the active map.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Active | Self::Acknowledged)
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ephemeral signal submitted by an evaluator.
///
/// Events are not persisted directly; they become [`Alert`]s only after
/// passing suppression, cooldown, and rule matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Short human-readable title.
    pub title: String,
    /// Longer description of what happened.
    pub description: String,
    /// Severity of the signal.
    pub severity: AlertSeverity,
    /// The subsystem that produced the event (e.g. `uptime`).
    pub source: String,
    /// A category within the source (e.g. an endpoint name).
    pub category: String,
    /// Free-form tags used by rule matching.
    pub tags: BTreeSet<String>,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
    /// String-keyed metadata carried onto the resulting alert.
    pub metadata: HashMap<String, String>,
}

impl AlertEvent {
    /// Creates a new event with the current timestamp.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        severity: AlertSeverity,
        source: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            severity,
            source: source.into(),
            category: category.into(),
            tags: BTreeSet::new(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The deduplication key for cooldown tracking.
    #[must_use]
    pub fn cooldown_key(&self) -> String {
        format!("{}:{}:{}", self.source, self.category, self.title)
    }
}

/// A persisted, actionable alert derived from an [`AlertEvent`].
///
/// Owned exclusively by the incident store once created; mutated only
/// through the acknowledge/resolve transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier: `{source}_{category}_{unix_ts}_{title hash}`.
    pub id: String,
    /// Short human-readable title.
    pub title: String,
    /// Longer description of what happened.
    pub description: String,
    /// Severity of the alert.
    pub severity: AlertSeverity,
    /// The subsystem that produced the originating event.
    pub source: String,
    /// Category within the source.
    pub category: String,
    /// Tags carried over from the event.
    pub tags: BTreeSet<String>,
    /// Lifecycle state.
    pub status: AlertStatus,
    /// When the alert was created.
    pub created_at: DateTime<Utc>,
    /// Metadata, including lifecycle stamps added by transitions.
    pub metadata: HashMap<String, String>,
}

impl Alert {
    /// Creates an ACTIVE alert from an event.
    #[must_use]
    pub fn from_event(event: &AlertEvent) -> Self {
        let created_at = Utc::now();
        Self {
            id: Self::generate_id(&event.source, &event.category, &event.title, created_at),
            title: event.title.clone(),
            description: event.description.clone(),
            severity: event.severity,
            source: event.source.clone(),
            category: event.category.clone(),
            tags: event.tags.clone(),
            status: AlertStatus::Active,
            created_at,
            metadata: event.metadata.clone(),
        }
    }

    /// Marks the alert acknowledged and stamps metadata.
    pub fn acknowledge(&mut self, who: &str) {
        self.status = AlertStatus::Acknowledged;
        self.metadata
            .insert("acknowledged_by".to_string(), who.to_string());
        self.metadata
            .insert("acknowledged_at".to_string(), Utc::now().to_rfc3339());
    }

    /// Marks the alert resolved and stamps metadata.
    pub fn resolve(&mut self, who: &str, note: &str) {
        self.status = AlertStatus::Resolved;
        self.metadata
            .insert("resolved_by".to_string(), who.to_string());
        self.metadata
            .insert("resolved_at".to_string(), Utc::now().to_rfc3339());
        if !note.is_empty() {
            self.metadata
                .insert("resolution_note".to_string(), note.to_string());
        }
    }

    /// Flags the alert as delivery-degraded (majority of channels failed).
    pub fn mark_delivery_degraded(&mut self) {
        self.metadata
            .insert("delivery_degraded".to_string(), "true".to_string());
    }

    /// Number of times this alert chain has already been escalated.
    ///
    /// Zero for alerts that are not part of an escalation chain.
    #[must_use]
    pub fn escalation_count(&self) -> u32 {
        self.metadata
            .get("escalation_count")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn generate_id(
        source: &str,
        category: &str,
        title: &str,
        created_at: DateTime<Utc>,
    ) -> String {
        use std::hash::{Hash, Hasher};

        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        title.hash(&mut hasher);
        let title_hash = hasher.finish() as u32;

        format!(
            "{}_{}_{}_{:08x}",
            source,
            category,
            created_at.timestamp(),
            title_hash
        )
    }
}
