//! The alerting service: the single inbound pipeline and query surface.
//!
//! `submit` runs suppression, rule matching, cooldown, dispatch, and
//! persistence strictly in order for each event. Events are independent
//! of each other; there is no cross-event ordering. Escalation timers
//! re-enter the same pipeline with a synthesized event, so an escalated
//! alert is matched, suppressed, and cooled down like any other.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::channels::ChannelRegistry;
use crate::config::AlertingConfig;
use crate::dispatch::{Dispatcher, DispatcherConfig};
use crate::escalation::EscalationScheduler;
use crate::rules::{AlertRule, RuleMatcher, RuleSet, SubstringMatcher};
use crate::store::{IncidentStore, StoreCounts};
use crate::suppression::{CooldownTracker, SuppressionPolicy};
use crate::types::{Alert, AlertEvent, AlertStatus};

/// The path an event took through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A suppression gate was closed; nothing was dispatched.
    Suppressed(&'static str),
    /// No enabled rule matched the event.
    NoMatch,
    /// A duplicate arrived inside the cooldown window.
    CoolingDown,
    /// The escalation chain reached its cap; no further alert raised.
    EscalationCapped,
    /// The alert was persisted and dispatch was attempted.
    Dispatched {
        /// Id of the persisted alert.
        alert_id: String,
        /// True if a strict majority of channels succeeded.
        delivered: bool,
    },
}

/// Monotonic counters over the life of the service.
#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    suppressed: AtomicU64,
    no_match: AtomicU64,
    cooled_down: AtomicU64,
    dispatched: AtomicU64,
    degraded: AtomicU64,
    escalated: AtomicU64,
}

/// A point-in-time statistics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    /// Events submitted since startup.
    pub submitted: u64,
    /// Events dropped by a suppression gate.
    pub suppressed: u64,
    /// Events no rule matched.
    pub no_match: u64,
    /// Events dropped by cooldown.
    pub cooled_down: u64,
    /// Alerts dispatched and persisted.
    pub dispatched: u64,
    /// Dispatches that missed the delivery majority.
    pub degraded: u64,
    /// Escalation events raised.
    pub escalated: u64,
    /// Open alerts by lifecycle state.
    pub active: usize,
    /// Acknowledged but unresolved alerts.
    pub acknowledged: usize,
    /// Alerts resolved inside the requested window.
    pub resolved_in_window: usize,
    /// Currently armed escalation timers.
    pub armed_escalations: usize,
}

/// Aggregate of the whole alerting pipeline.
///
/// Construct one per process and `Clone` it freely; clones share the
/// store, cooldowns, timers, and counters.
#[derive(Debug, Clone)]
pub struct AlertingService {
    config: Arc<AlertingConfig>,
    rules: Arc<RuleSet>,
    matcher: Arc<dyn RuleMatcher>,
    suppression: SuppressionPolicy,
    cooldowns: CooldownTracker,
    dispatcher: Dispatcher,
    scheduler: EscalationScheduler,
    store: IncidentStore,
    counters: Arc<Counters>,
}

impl AlertingService {
    /// Builds a service from configuration, rules, and a channel
    /// registry, using the default loose rule matcher.
    #[must_use]
    pub fn new(config: AlertingConfig, rules: RuleSet, registry: ChannelRegistry) -> Self {
        Self::with_matcher(config, rules, registry, Arc::new(SubstringMatcher))
    }

    /// Builds a service with an explicit rule-matching strategy.
    #[must_use]
    pub fn with_matcher(
        config: AlertingConfig,
        rules: RuleSet,
        registry: ChannelRegistry,
        matcher: Arc<dyn RuleMatcher>,
    ) -> Self {
        let suppression = config.suppression_policy();
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            DispatcherConfig {
                channel_timeout: config.channel_timeout,
            },
        );

        Self {
            config: Arc::new(config),
            rules: Arc::new(rules),
            matcher,
            suppression,
            cooldowns: CooldownTracker::new(),
            dispatcher,
            scheduler: EscalationScheduler::new(),
            store: IncidentStore::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Runs one event through the pipeline.
    ///
    /// Stages run strictly in order: suppression, rule matching,
    /// escalation-cap check, cooldown, dispatch, persistence,
    /// escalation arming. Each stage short-circuits with the
    /// corresponding [`SubmitOutcome`].
    pub async fn submit(&self, event: AlertEvent) -> SubmitOutcome {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();

        if let Some(reason) = self.suppression.is_suppressed(now) {
            self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
            info!(title = %event.title, reason, "event suppressed");
            return SubmitOutcome::Suppressed(reason);
        }

        let matched = self.rules.matching(self.matcher.as_ref(), &event);
        if matched.is_empty() {
            self.counters.no_match.fetch_add(1, Ordering::Relaxed);
            warn!(
                title = %event.title,
                severity = %event.severity,
                source = %event.source,
                "no rule matched event"
            );
            return SubmitOutcome::NoMatch;
        }

        let chain_len = escalation_count(&event);
        if chain_len > self.config.escalation.max_escalations {
            warn!(
                title = %event.title,
                chain_len,
                cap = self.config.escalation.max_escalations,
                "escalation chain reached cap"
            );
            return SubmitOutcome::EscalationCapped;
        }

        let cooldown_minutes = RuleSet::min_cooldown_minutes(&matched)
            .max(self.config.min_cooldown_minutes);
        let cooldown = chrono::Duration::minutes(i64::try_from(cooldown_minutes).unwrap_or(i64::MAX));
        if !self.cooldowns.check_and_touch(&event.cooldown_key(), cooldown, now) {
            self.counters.cooled_down.fetch_add(1, Ordering::Relaxed);
            info!(key = %event.cooldown_key(), "duplicate event inside cooldown");
            return SubmitOutcome::CoolingDown;
        }

        let mut kinds = RuleSet::channel_union(&matched);
        kinds.retain(|kind| self.config.channel_enabled(*kind));
        let mut alert = Alert::from_event(&event);
        let outcome = self.dispatcher.dispatch(&alert, &kinds).await;

        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        if !outcome.delivered() {
            self.counters.degraded.fetch_add(1, Ordering::Relaxed);
            alert.mark_delivery_degraded();
            error!(
                alert_id = %alert.id,
                successes = outcome.successes,
                attempted = outcome.attempted,
                "alert delivery degraded"
            );
        }

        let alert_id = alert.id.clone();
        let delivered = outcome.delivered();
        self.store.create(alert);

        if self.config.escalation.enabled && chain_len < self.config.escalation.max_escalations {
            self.arm_escalation(&alert_id, &event, &matched);
        }

        SubmitOutcome::Dispatched { alert_id, delivered }
    }

    fn arm_escalation(&self, alert_id: &str, event: &AlertEvent, matched: &[&AlertRule]) {
        // The matched minimum wins even when a rule asks for 0 minutes;
        // the config default only applies when nothing matched.
        let minutes = if matched.is_empty() {
            self.config.escalation.default_minutes
        } else {
            RuleSet::min_escalation_minutes(matched)
        };
        let delay = Duration::from_secs(minutes * 60);

        let service = self.clone();
        let escalated = escalate_event(event, alert_id);
        let id = alert_id.to_string();

        self.scheduler.arm(
            alert_id,
            delay,
            Box::pin(async move {
                // An acknowledge can land after the timer unregisters
                // itself but before this runs; re-check the store.
                if service.store.status(&id) != Some(AlertStatus::Active) {
                    debug!(alert_id = %id, "escalation timer fired for non-active alert");
                    return;
                }
                service.counters.escalated.fetch_add(1, Ordering::Relaxed);
                warn!(alert_id = %id, "alert unacknowledged, escalating");
                let _ = service.submit(escalated).await;
            }),
        );
    }

    /// Acknowledges an open alert and cancels its escalation timer.
    ///
    /// Returns false if the id is unknown.
    pub fn acknowledge(&self, id: &str, who: &str) -> bool {
        let found = self.store.acknowledge(id, who);
        if found {
            self.scheduler.cancel(id);
        }
        found
    }

    /// Resolves an open alert and cancels its escalation timer.
    ///
    /// Returns false if the id is unknown.
    pub fn resolve(&self, id: &str, who: &str, note: &str) -> bool {
        let found = self.store.resolve(id, who, note);
        if found {
            self.scheduler.cancel(id);
        }
        found
    }

    /// Snapshot of all open alerts, newest first.
    #[must_use]
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.store.active_alerts()
    }

    /// Looks up one open alert.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Alert> {
        self.store.get(id)
    }

    /// Runtime toggles for the suppression gates.
    #[must_use]
    pub fn suppression(&self) -> &SuppressionPolicy {
        &self.suppression
    }

    /// Statistics over the service lifetime plus the given history
    /// window for resolved counts.
    #[must_use]
    pub fn statistics(&self, window: chrono::Duration) -> ServiceStats {
        let StoreCounts { active, acknowledged, .. } = self.store.counts();
        ServiceStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            suppressed: self.counters.suppressed.load(Ordering::Relaxed),
            no_match: self.counters.no_match.load(Ordering::Relaxed),
            cooled_down: self.counters.cooled_down.load(Ordering::Relaxed),
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
            escalated: self.counters.escalated.load(Ordering::Relaxed),
            active,
            acknowledged,
            resolved_in_window: self.store.resolved_since(Utc::now() - window).len(),
            armed_escalations: self.scheduler.armed_count(),
        }
    }

    /// JSON blob for dashboards: stats plus current open alerts.
    #[must_use]
    pub fn dashboard_data(&self) -> serde_json::Value {
        let stats = self.statistics(chrono::Duration::hours(24));
        serde_json::json!({
            "generated_at": Utc::now().to_rfc3339(),
            "stats": stats,
            "active_alerts": self.store.active_alerts(),
            "rules": self.rules.rules(),
        })
    }
}

/// Chain position of an event: 0 for an original, N for the Nth
/// escalation.
fn escalation_count(event: &AlertEvent) -> u32 {
    event
        .metadata
        .get("escalation_count")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Synthesizes the escalated follow-up event for an unacknowledged
/// alert: severity bumped, title prefixed, chain metadata stamped.
fn escalate_event(original: &AlertEvent, alert_id: &str) -> AlertEvent {
    let mut event = AlertEvent::new(
        format!("ESCALATED: {}", original.title),
        original.severity.escalated(),
        original.source.clone(),
        original.category.clone(),
    )
    .with_description(original.description.clone())
    .with_tag("escalated")
    .with_metadata("escalation_of", alert_id)
    .with_metadata(
        "escalation_count",
        (escalation_count(original) + 1).to_string(),
    );

    for tag in &original.tags {
        event = event.with_tag(tag.clone());
    }
    event
}
