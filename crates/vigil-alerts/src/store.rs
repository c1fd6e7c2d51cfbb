//! The authoritative store of active alerts and bounded history.
//!
//! Alerts are owned by the store once created and mutated only through
//! the acknowledge/resolve transitions. Acknowledging keeps the alert
//! in the active map; resolving moves it to history. History is
//! bounded by entry count and pruned by age on write.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::types::{Alert, AlertStatus};

/// How long resolved alerts are retained in history.
const HISTORY_RETENTION_DAYS: i64 = 7;

/// Maximum number of history entries.
const HISTORY_MAX_ENTRIES: usize = 10_000;

/// Counts of alerts by lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    /// Alerts in the active map with status ACTIVE.
    pub active: usize,
    /// Alerts in the active map with status ACKNOWLEDGED.
    pub acknowledged: usize,
    /// Alerts in the history buffer.
    pub resolved: usize,
}

/// Authoritative map of open alerts plus bounded resolved history.
#[derive(Debug, Clone, Default)]
pub struct IncidentStore {
    active: Arc<RwLock<HashMap<String, Alert>>>,
    history: Arc<RwLock<VecDeque<Alert>>>,
}

impl IncidentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a newly created alert into the active map.
    pub fn create(&self, alert: Alert) {
        info!(
            alert_id = %alert.id,
            severity = %alert.severity,
            title = %alert.title,
            "alert created"
        );
        self.active.write().insert(alert.id.clone(), alert);
    }

    /// Acknowledges an open alert.
    ///
    /// Returns false if `id` is not in the active map; that is a
    /// reported condition, not an error. The alert stays in the
    /// active map.
    pub fn acknowledge(&self, id: &str, who: &str) -> bool {
        let mut active = self.active.write();
        match active.get_mut(id) {
            Some(alert) => {
                alert.acknowledge(who);
                info!(alert_id = %id, who = %who, "alert acknowledged");
                true
            }
            None => {
                debug!(alert_id = %id, "acknowledge on unknown alert");
                false
            }
        }
    }

    /// Resolves an open alert and moves it to history.
    ///
    /// Returns false if `id` is not in the active map.
    pub fn resolve(&self, id: &str, who: &str, note: &str) -> bool {
        let mut active = self.active.write();
        match active.remove(id) {
            Some(mut alert) => {
                alert.resolve(who, note);
                info!(alert_id = %id, who = %who, "alert resolved");
                drop(active);
                self.push_history(alert);
                true
            }
            None => {
                debug!(alert_id = %id, "resolve on unknown alert");
                false
            }
        }
    }

    /// Returns a copy of an open alert.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Alert> {
        self.active.read().get(id).cloned()
    }

    /// Current status of an alert by id, open alerts only.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<AlertStatus> {
        self.active.read().get(id).map(|a| a.status)
    }

    /// Snapshot of all open alerts, newest first.
    #[must_use]
    pub fn active_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<_> = self.active.read().values().cloned().collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    /// Snapshot of resolved history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Alert> {
        self.history.read().iter().cloned().collect()
    }

    /// Counts by lifecycle state.
    #[must_use]
    pub fn counts(&self) -> StoreCounts {
        let active = self.active.read();
        let mut counts = StoreCounts {
            resolved: self.history.read().len(),
            ..StoreCounts::default()
        };
        for alert in active.values() {
            match alert.status {
                AlertStatus::Active => counts.active += 1,
                AlertStatus::Acknowledged => counts.acknowledged += 1,
                AlertStatus::Resolved => {}
            }
        }
        counts
    }

    /// Alerts resolved since `cutoff`, for statistics windows.
    #[must_use]
    pub fn resolved_since(&self, cutoff: DateTime<Utc>) -> Vec<Alert> {
        self.history
            .read()
            .iter()
            .filter(|a| a.created_at >= cutoff)
            .cloned()
            .collect()
    }

    fn push_history(&self, alert: Alert) {
        let mut history = self.history.write();
        history.push_back(alert);

        let horizon = Utc::now() - Duration::days(HISTORY_RETENTION_DAYS);
        while let Some(front) = history.front() {
            if front.created_at < horizon || history.len() > HISTORY_MAX_ENTRIES {
                history.pop_front();
            } else {
                break;
            }
        }
    }
}
