//! Escalation timers for unacknowledged alerts.
//!
//! Every ACTIVE alert carries at most one armed timer. When the timer
//! fires the caller-supplied action runs (the service re-submits an
//! escalated event through the full pipeline); acknowledging or
//! resolving the alert cancels the timer. Cancellation is idempotent:
//! cancelling a fired or already-cancelled timer is a no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Configuration for escalation behavior.
#[derive(Debug, Clone)]
pub struct EscalationConfig {
    /// Whether escalation timers are armed at all.
    pub enabled: bool,
    /// Delay used when no matched rule specifies one, in minutes.
    pub default_minutes: u64,
    /// Maximum escalations per alert chain. Without a cap an
    /// unacknowledged alert would re-escalate forever.
    pub max_escalations: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_minutes: 30,
            max_escalations: 3,
        }
    }
}

/// Arms and cancels per-alert escalation timers.
#[derive(Debug, Clone, Default)]
pub struct EscalationScheduler {
    timers: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl EscalationScheduler {
    /// Creates a scheduler with no armed timers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer for `alert_id`, replacing (and cancelling) any
    /// previous timer for the same id.
    ///
    /// After `delay`, `on_fire` runs unless the timer was cancelled
    /// first. The timer unregisters itself before firing, so a cancel
    /// racing the fire is a harmless no-op.
    pub fn arm(&self, alert_id: &str, delay: Duration, on_fire: BoxFuture<'static, ()>) {
        let token = CancellationToken::new();

        if let Some(previous) = self
            .timers
            .lock()
            .insert(alert_id.to_string(), token.clone())
        {
            previous.cancel();
        }

        let timers = Arc::clone(&self.timers);
        let id = alert_id.to_string();

        debug!(alert_id = %id, delay_secs = delay.as_secs(), "escalation timer armed");

        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(alert_id = %id, "escalation timer cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    timers.lock().remove(&id);
                    debug!(alert_id = %id, "escalation timer fired");
                    on_fire.await;
                }
            }
        });
    }

    /// Cancels the timer for `alert_id` if one is armed.
    ///
    /// Returns true if a timer was actually cancelled. Safe to call
    /// any number of times.
    pub fn cancel(&self, alert_id: &str) -> bool {
        if let Some(token) = self.timers.lock().remove(alert_id) {
            token.cancel();
            true
        } else {
            false
        }
    }

    /// Number of currently armed timers.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.timers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fire(counter: &Arc<AtomicUsize>) -> BoxFuture<'static, ()> {
        let counter = Arc::clone(counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn timer_fires_after_delay() {
        let scheduler = EscalationScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.arm("a-1", Duration::from_millis(20), counting_fire(&fired));
        assert_eq!(scheduler.armed_count(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test]
    async fn cancel_prevents_fire() {
        let scheduler = EscalationScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.arm("a-1", Duration::from_millis(30), counting_fire(&fired));
        assert!(scheduler.cancel("a-1"));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let scheduler = EscalationScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.arm("a-1", Duration::from_millis(30), counting_fire(&fired));
        assert!(scheduler.cancel("a-1"));
        assert!(!scheduler.cancel("a-1"));
        assert!(!scheduler.cancel("never-armed"));
    }

    #[tokio::test]
    async fn cancel_after_fire_is_noop() {
        let scheduler = EscalationScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.arm("a-1", Duration::from_millis(10), counting_fire(&fired));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.cancel("a-1"));
    }

    #[tokio::test]
    async fn rearming_replaces_previous_timer() {
        let scheduler = EscalationScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        scheduler.arm("a-1", Duration::from_millis(20), counting_fire(&first));
        scheduler.arm("a-1", Duration::from_millis(20), counting_fire(&second));
        assert_eq!(scheduler.armed_count(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn independent_timers_do_not_interfere() {
        let scheduler = EscalationScheduler::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        scheduler.arm("a-1", Duration::from_millis(20), counting_fire(&a));
        scheduler.arm("b-1", Duration::from_millis(20), counting_fire(&b));
        assert!(scheduler.cancel("a-1"));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_config() {
        let config = EscalationConfig::default();
        assert!(config.enabled);
        assert_eq!(config.default_minutes, 30);
        assert_eq!(config.max_escalations, 3);
    }
}
