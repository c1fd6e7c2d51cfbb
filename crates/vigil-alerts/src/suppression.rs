//! Suppression policy and cooldown tracking.
//!
//! Suppression is the global gate evaluated before anything else:
//! maintenance mode, a time-of-day maintenance window, or a deployment
//! in progress silences every event. Cooldown is the per-key
//! deduplication applied after suppression: repeats of the same
//! (source, category, title) inside the matched cooldown window are
//! dropped, but the first occurrence of a key is never suppressed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{AlertError, Result};

/// Cooldown entries older than this are garbage-collected.
const COOLDOWN_GC_AGE_HOURS: i64 = 24;

/// GC runs when the cooldown map grows past this many entries.
const COOLDOWN_GC_THRESHOLD: usize = 256;

/// A daily time-of-day window, possibly wrapping past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl MaintenanceWindow {
    /// Creates a window from start/end times.
    #[must_use]
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parses a window from an `HH:MM-HH:MM` string.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` on malformed input; this is
    /// fatal at startup by design.
    pub fn parse(spec: &str) -> Result<Self> {
        let (start_s, end_s) = spec.split_once('-').ok_or_else(|| AlertError::InvalidConfig {
            reason: format!("maintenance window '{spec}' is not of the form HH:MM-HH:MM"),
        })?;

        let parse_time = |s: &str| {
            NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| AlertError::InvalidConfig {
                reason: format!("invalid time '{s}' in maintenance window: {e}"),
            })
        };

        Ok(Self::new(parse_time(start_s)?, parse_time(end_s)?))
    }

    /// Returns true if `time` falls inside the window.
    ///
    /// A window whose end precedes its start wraps past midnight
    /// (22:00-02:00 covers 22:00..24:00 and 00:00..02:00). The start
    /// is inclusive, the end exclusive.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// The global pre-dispatch gate.
///
/// `is_suppressed` is a pure function of wall-clock time and the
/// current flags; the flags themselves may be toggled at runtime (a
/// deployment begins, an operator enables maintenance mode).
#[derive(Debug, Clone, Default)]
pub struct SuppressionPolicy {
    maintenance_mode: Arc<AtomicBool>,
    deployment_in_progress: Arc<AtomicBool>,
    window: Option<MaintenanceWindow>,
}

impl SuppressionPolicy {
    /// Creates a policy with all gates open.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the daily maintenance window.
    #[must_use]
    pub const fn with_window(mut self, window: MaintenanceWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Toggles explicit maintenance mode.
    pub fn set_maintenance_mode(&self, on: bool) {
        self.maintenance_mode.store(on, Ordering::SeqCst);
    }

    /// Toggles the deployment-in-progress flag.
    pub fn set_deployment_in_progress(&self, on: bool) {
        self.deployment_in_progress.store(on, Ordering::SeqCst);
    }

    /// Returns the suppression reason active at `now`, if any.
    #[must_use]
    pub fn is_suppressed(&self, now: DateTime<Utc>) -> Option<&'static str> {
        if self.maintenance_mode.load(Ordering::SeqCst) {
            return Some("maintenance-mode");
        }
        if self.deployment_in_progress.load(Ordering::SeqCst) {
            return Some("deployment-in-progress");
        }
        if let Some(window) = &self.window {
            if window.contains(now.time()) {
                return Some("maintenance-window");
            }
        }
        None
    }
}

/// De-duplicates alerts keyed by `source:category:title`.
#[derive(Debug, Clone, Default)]
pub struct CooldownTracker {
    last_sent: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl CooldownTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the event may proceed, recording `now` as the
    /// last-sent time for `key` when it does.
    ///
    /// The first occurrence of a key always proceeds. Repeats proceed
    /// only once `cooldown` has elapsed since the last send. Stale
    /// entries are garbage-collected opportunistically while the lock
    /// is held.
    pub fn check_and_touch(&self, key: &str, cooldown: Duration, now: DateTime<Utc>) -> bool {
        let mut last_sent = self.last_sent.lock();

        if let Some(&sent_at) = last_sent.get(key) {
            if now.signed_duration_since(sent_at) < cooldown {
                debug!(key = %key, "event within cooldown window");
                return false;
            }
        }

        last_sent.insert(key.to_string(), now);

        if last_sent.len() > COOLDOWN_GC_THRESHOLD {
            let horizon = now - Duration::hours(COOLDOWN_GC_AGE_HOURS);
            last_sent.retain(|_, &mut sent_at| sent_at > horizon);
        }

        true
    }

    /// Number of tracked keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.last_sent.lock().len()
    }

    /// Returns true if no key is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_sent.lock().is_empty()
    }
}
