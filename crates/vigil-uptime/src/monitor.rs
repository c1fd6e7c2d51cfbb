//! The monitor: probe scheduling, periodic evaluations, and the query
//! surface over per-endpoint state.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use vigil_alerts::{AlertEvent, AlertSeverity, AlertingService};

use crate::error::{Result, UptimeError};
use crate::probe::{NetProber, Prober};
use crate::state::{EndpointState, ProbeEvent, to_alert_event};
use crate::stats::{ResultWindow, UptimeStats};
use crate::types::{CheckResult, EndpointCheck, Incident};

/// Where probe events end up.
///
/// The monitor is generic over this seam so tests can capture events
/// instead of running the full alerting pipeline.
pub trait EventSink: Send + Sync {
    /// Consumes one alert event.
    fn submit(&self, event: AlertEvent) -> BoxFuture<'_, ()>;
}

impl EventSink for AlertingService {
    fn submit(&self, event: AlertEvent) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let _ = AlertingService::submit(self, event).await;
        })
    }
}

/// Timing and threshold knobs for the monitor's evaluator task.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Seconds between SSL/SLA evaluation sweeps.
    pub evaluation_interval_secs: u64,
    /// Certificate expiry within this many days raises a Warning.
    pub ssl_warning_days: i64,
    /// Certificate expiry within this many days raises a Critical.
    pub ssl_critical_days: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_secs: 3600,
            ssl_warning_days: 30,
            ssl_critical_days: 7,
        }
    }
}

/// Schedules probes for a set of endpoints and feeds the resulting
/// events into an [`EventSink`].
///
/// Clones share all state; the probe loops run until [`stop`] or
/// process shutdown.
///
/// [`stop`]: UptimeMonitor::stop
#[derive(Debug)]
pub struct UptimeMonitor<S> {
    endpoints: Arc<Vec<EndpointCheck>>,
    config: MonitorConfig,
    prober: Arc<dyn Prober>,
    sink: Arc<S>,
    states: Arc<RwLock<HashMap<String, EndpointState>>>,
    windows: Arc<RwLock<HashMap<String, ResultWindow>>>,
    closed_incidents: Arc<RwLock<Vec<Incident>>>,
    running: Arc<AtomicBool>,
}

impl<S> Clone for UptimeMonitor<S> {
    fn clone(&self) -> Self {
        Self {
            endpoints: Arc::clone(&self.endpoints),
            config: self.config.clone(),
            prober: Arc::clone(&self.prober),
            sink: Arc::clone(&self.sink),
            states: Arc::clone(&self.states),
            windows: Arc::clone(&self.windows),
            closed_incidents: Arc::clone(&self.closed_incidents),
            running: Arc::clone(&self.running),
        }
    }
}

impl<S: EventSink + 'static> UptimeMonitor<S> {
    /// Creates a monitor probing over the network.
    #[must_use]
    pub fn new(endpoints: Vec<EndpointCheck>, config: MonitorConfig, sink: Arc<S>) -> Self {
        Self::with_prober(endpoints, config, sink, Arc::new(NetProber::new()))
    }

    /// Creates a monitor with an explicit prober.
    #[must_use]
    pub fn with_prober(
        endpoints: Vec<EndpointCheck>,
        config: MonitorConfig,
        sink: Arc<S>,
        prober: Arc<dyn Prober>,
    ) -> Self {
        let states = endpoints
            .iter()
            .map(|e| (e.name.clone(), EndpointState::default()))
            .collect();
        let windows = endpoints
            .iter()
            .map(|e| (e.name.clone(), ResultWindow::new()))
            .collect();

        Self {
            endpoints: Arc::new(endpoints),
            config,
            prober,
            sink,
            states: Arc::new(RwLock::new(states)),
            windows: Arc::new(RwLock::new(windows)),
            closed_incidents: Arc::new(RwLock::new(Vec::new())),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Starts one probe loop per enabled endpoint.
    ///
    /// Loops tick at each endpoint's own interval; a slow probe delays
    /// the next tick rather than bursting to catch up.
    pub fn spawn_probes(&self) {
        for check in self.endpoints.iter().filter(|e| e.enabled).cloned() {
            let monitor = self.clone();
            info!(
                endpoint = %check.name,
                target = %check.target,
                kind = %check.kind,
                interval_secs = check.interval_secs,
                "starting probe loop"
            );

            tokio::spawn(async move {
                let mut ticker =
                    tokio::time::interval(Duration::from_secs(check.interval_secs));
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                while monitor.running.load(Ordering::SeqCst) {
                    ticker.tick().await;
                    if !monitor.running.load(Ordering::SeqCst) {
                        break;
                    }
                    monitor.run_check_cycle(&check).await;
                }
                debug!(endpoint = %check.name, "probe loop stopped");
            });
        }
    }

    /// Starts the periodic SSL-expiry and SLA evaluation task.
    pub fn spawn_evaluators(&self) {
        let monitor = self.clone();
        let period = Duration::from_secs(self.config.evaluation_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // skip the immediate first tick; there is nothing to
            // evaluate before the first probes complete
            ticker.tick().await;

            while monitor.running.load(Ordering::SeqCst) {
                ticker.tick().await;
                if !monitor.running.load(Ordering::SeqCst) {
                    break;
                }
                monitor.run_evaluations().await;
            }
        });
    }

    /// Stops all spawned loops at their next tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Probes one endpoint and folds the result into state, windows,
    /// incidents, and the event sink.
    pub async fn run_check_cycle(&self, check: &EndpointCheck) {
        let result = self.prober.check(check).await;
        self.record(check, result).await;
    }

    /// Records an already-obtained result; the testable core of the
    /// probe loop.
    pub async fn record(&self, check: &EndpointCheck, result: CheckResult) {
        self.windows
            .write()
            .entry(check.name.clone())
            .or_default()
            .push(result.clone());

        let events = self
            .states
            .write()
            .entry(check.name.clone())
            .or_default()
            .observe(&result);

        for event in events {
            if let ProbeEvent::Recovered { incident } = &event {
                self.closed_incidents.write().push(incident.clone());
            }
            let alert = to_alert_event(check, &event);
            self.sink.submit(alert).await;
        }
    }

    /// One SSL/SLA sweep over every endpoint.
    pub async fn run_evaluations(&self) {
        for check in self.endpoints.iter().filter(|e| e.enabled) {
            if let Some(event) = self.evaluate_ssl(check) {
                self.sink.submit(event).await;
            }
            if let Some(event) = self.evaluate_sla(check) {
                self.sink.submit(event).await;
            }
        }
    }

    /// Raises an event when the latest probe reported a certificate
    /// close to expiry. Deduplication is the alerting cooldown's job.
    fn evaluate_ssl(&self, check: &EndpointCheck) -> Option<AlertEvent> {
        let windows = self.windows.read();
        let latest = windows.get(&check.name)?.snapshot().pop()?;
        let days = latest.ssl_expiry_days?;

        if days > self.config.ssl_warning_days {
            return None;
        }

        let severity = if days <= self.config.ssl_critical_days {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };
        warn!(endpoint = %check.name, days, "certificate close to expiry");

        Some(
            AlertEvent::new(
                format!("{} certificate expires in {days} days", check.name),
                severity,
                "uptime",
                check.name.clone(),
            )
            .with_tag("uptime")
            .with_tag("ssl")
            .with_metadata("ssl_expiry_days", days.to_string()),
        )
    }

    /// Raises an event when 24h uptime has fallen below the endpoint's
    /// SLA target.
    fn evaluate_sla(&self, check: &EndpointCheck) -> Option<AlertEvent> {
        let stats = self.stats(&check.name).ok()?;
        if stats.sla_compliant || stats.total_checks == 0 {
            return None;
        }

        warn!(
            endpoint = %check.name,
            uptime = stats.uptime_percent,
            target = stats.sla_target,
            "endpoint out of sla"
        );

        Some(
            AlertEvent::new(
                format!("{} below SLA target", check.name),
                AlertSeverity::Critical,
                "uptime",
                check.name.clone(),
            )
            .with_description(format!(
                "uptime {:.3}% over 24h, target {:.3}%",
                stats.uptime_percent, stats.sla_target
            ))
            .with_tag("uptime")
            .with_tag("sla")
            .with_metadata("uptime_percent", format!("{:.3}", stats.uptime_percent)),
        )
    }

    /// Statistics for one endpoint over its rolling window.
    ///
    /// # Errors
    ///
    /// Returns `UptimeError::UnknownEndpoint` for names the monitor
    /// does not track.
    pub fn stats(&self, endpoint: &str) -> Result<UptimeStats> {
        let check = self
            .endpoints
            .iter()
            .find(|e| e.name == endpoint)
            .ok_or_else(|| UptimeError::UnknownEndpoint {
                name: endpoint.to_string(),
            })?;

        let results = self
            .windows
            .read()
            .get(endpoint)
            .map(ResultWindow::snapshot)
            .unwrap_or_default();
        Ok(UptimeStats::compute(endpoint, &results, check.sla_target))
    }

    /// Statistics for every endpoint.
    #[must_use]
    pub fn all_stats(&self) -> Vec<UptimeStats> {
        self.endpoints
            .iter()
            .filter_map(|e| self.stats(&e.name).ok())
            .collect()
    }

    /// All closed incidents, oldest first.
    #[must_use]
    pub fn incidents(&self) -> Vec<Incident> {
        self.closed_incidents.read().clone()
    }

    /// Incidents currently open (endpoints DOWN right now).
    #[must_use]
    pub fn open_incidents(&self) -> Vec<Incident> {
        self.states
            .read()
            .values()
            .filter_map(|s| s.open_incident().cloned())
            .collect()
    }

    /// Snapshot of one endpoint's rolling result window.
    #[must_use]
    pub fn results(&self, endpoint: &str) -> Vec<CheckResult> {
        self.windows
            .read()
            .get(endpoint)
            .map(ResultWindow::snapshot)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckKind, EndpointStatus};
    use parking_lot::Mutex;

    /// Sink that captures submitted events.
    #[derive(Debug, Default)]
    struct CapturingSink {
        events: Mutex<Vec<AlertEvent>>,
    }

    impl EventSink for CapturingSink {
        fn submit(&self, event: AlertEvent) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                self.events.lock().push(event);
            })
        }
    }

    impl CapturingSink {
        fn events(&self) -> Vec<AlertEvent> {
            self.events.lock().clone()
        }
    }

    /// Prober that replays a scripted sequence of statuses.
    #[derive(Debug)]
    struct ScriptedProber {
        script: Mutex<Vec<CheckResult>>,
    }

    impl ScriptedProber {
        fn new(mut results: Vec<CheckResult>) -> Self {
            results.reverse();
            Self {
                script: Mutex::new(results),
            }
        }
    }

    impl Prober for ScriptedProber {
        fn check<'a>(&'a self, check: &'a EndpointCheck) -> BoxFuture<'a, CheckResult> {
            Box::pin(async move {
                self.script
                    .lock()
                    .pop()
                    .unwrap_or_else(|| CheckResult::up(&check.name, 1))
            })
        }
    }

    fn endpoint(name: &str) -> EndpointCheck {
        EndpointCheck::builder(name, "https://example.com/health", CheckKind::Http)
            .critical(true)
            .build()
            .unwrap()
    }

    fn monitor_with(
        endpoints: Vec<EndpointCheck>,
        script: Vec<CheckResult>,
    ) -> (UptimeMonitor<CapturingSink>, Arc<CapturingSink>) {
        let sink = Arc::new(CapturingSink::default());
        let monitor = UptimeMonitor::with_prober(
            endpoints,
            MonitorConfig::default(),
            Arc::clone(&sink),
            Arc::new(ScriptedProber::new(script)),
        );
        (monitor, sink)
    }

    #[tokio::test]
    async fn down_probes_emit_change_then_hysteresis_event() {
        let api = endpoint("api");
        let script = vec![
            CheckResult::down("api", 0, "refused"),
            CheckResult::down("api", 0, "refused"),
            CheckResult::down("api", 0, "refused"),
        ];
        let (monitor, sink) = monitor_with(vec![api.clone()], script);

        for _ in 0..3 {
            monitor.run_check_cycle(&api).await;
        }

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "api is DOWN");
        assert_eq!(events[0].severity, AlertSeverity::Critical);
        assert!(events[1].tags.contains("consecutive-failures"));
    }

    #[tokio::test]
    async fn recovery_emits_single_event_and_closes_incident() {
        let api = endpoint("api");
        let script = vec![
            CheckResult::down("api", 0, "refused"),
            CheckResult::up("api", 5),
        ];
        let (monitor, sink) = monitor_with(vec![api.clone()], script);

        monitor.run_check_cycle(&api).await;
        assert_eq!(monitor.open_incidents().len(), 1);

        monitor.run_check_cycle(&api).await;
        assert!(monitor.open_incidents().is_empty());

        let incidents = monitor.incidents();
        assert_eq!(incidents.len(), 1);
        assert!(!incidents[0].is_open());

        let recovery: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| e.tags.contains("recovery"))
            .collect();
        assert_eq!(recovery.len(), 1);
        assert_eq!(recovery[0].severity, AlertSeverity::Info);
    }

    #[tokio::test]
    async fn steady_up_probes_emit_nothing() {
        let api = endpoint("api");
        let script = vec![CheckResult::up("api", 5); 5];
        let (monitor, sink) = monitor_with(vec![api.clone()], script);

        for _ in 0..5 {
            monitor.run_check_cycle(&api).await;
        }
        assert!(sink.events().is_empty());
        assert_eq!(monitor.results("api").len(), 5);
    }

    #[tokio::test]
    async fn stats_reflect_recorded_results() {
        let api = endpoint("api");
        let script = vec![
            CheckResult::up("api", 10),
            CheckResult::down("api", 0, "refused"),
            CheckResult::up("api", 10),
            CheckResult::up("api", 10),
        ];
        let (monitor, _sink) = monitor_with(vec![api.clone()], script);

        for _ in 0..4 {
            monitor.run_check_cycle(&api).await;
        }

        let stats = monitor.stats("api").unwrap();
        assert_eq!(stats.total_checks, 4);
        assert_eq!(stats.down_checks, 1);
        assert_eq!(stats.current_up_streak, 2);
        assert!((stats.uptime_percent - 75.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn stats_for_unknown_endpoint_errors() {
        let (monitor, _sink) = monitor_with(vec![endpoint("api")], Vec::new());
        let err = monitor.stats("nope").unwrap_err();
        assert!(matches!(err, UptimeError::UnknownEndpoint { .. }));
    }

    #[tokio::test]
    async fn sla_evaluation_fires_below_target() {
        let api = endpoint("api");
        let script = vec![
            CheckResult::up("api", 10),
            CheckResult::down("api", 0, "refused"),
        ];
        let (monitor, sink) = monitor_with(vec![api.clone()], script);

        monitor.run_check_cycle(&api).await;
        monitor.run_check_cycle(&api).await;
        let before = sink.events().len();

        // 50% uptime against a 99.9% target
        monitor.run_evaluations().await;
        let events = sink.events();
        let sla: Vec<_> = events[before..]
            .iter()
            .filter(|e| e.tags.contains("sla"))
            .collect();
        assert_eq!(sla.len(), 1);
        assert_eq!(sla[0].severity, AlertSeverity::Critical);
    }

    #[tokio::test]
    async fn sla_evaluation_silent_when_compliant() {
        let api = endpoint("api");
        let script = vec![CheckResult::up("api", 10); 3];
        let (monitor, sink) = monitor_with(vec![api.clone()], script);

        for _ in 0..3 {
            monitor.run_check_cycle(&api).await;
        }
        monitor.run_evaluations().await;
        assert!(sink.events().iter().all(|e| !e.tags.contains("sla")));
    }

    #[tokio::test]
    async fn ssl_evaluation_grades_by_days_remaining() {
        let api = endpoint("api");
        let (monitor, sink) = monitor_with(vec![api.clone()], Vec::new());

        let mut result = CheckResult::up("api", 5);
        result.ssl_expiry_days = Some(20);
        monitor.record(&api, result).await;
        monitor.run_evaluations().await;

        let ssl: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| e.tags.contains("ssl"))
            .collect();
        assert_eq!(ssl.len(), 1);
        assert_eq!(ssl[0].severity, AlertSeverity::Warning);

        let mut result = CheckResult::up("api", 5);
        result.ssl_expiry_days = Some(3);
        monitor.record(&api, result).await;
        monitor.run_evaluations().await;

        let critical: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| e.tags.contains("ssl") && e.severity == AlertSeverity::Critical)
            .collect();
        assert_eq!(critical.len(), 1);
    }

    #[tokio::test]
    async fn ssl_evaluation_silent_without_expiry_data() {
        let api = endpoint("api");
        let (monitor, sink) = monitor_with(vec![api.clone()], Vec::new());

        monitor.record(&api, CheckResult::up("api", 5)).await;
        monitor.run_evaluations().await;
        assert!(sink.events().iter().all(|e| !e.tags.contains("ssl")));
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_probe_loop_records_results() {
        let api = EndpointCheck::builder("api", "https://example.com", CheckKind::Http)
            .interval_secs(1)
            .build()
            .unwrap();
        let (monitor, _sink) = monitor_with(
            vec![api],
            vec![CheckResult::up("api", 1); 4],
        );

        monitor.spawn_probes();
        // the loop has to be polled once before the clock moves, so its
        // first interval tick completes and the sleep is registered
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(2500)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        monitor.stop();

        assert!(!monitor.results("api").is_empty());
    }

    #[tokio::test]
    async fn feeds_alerting_service_end_to_end() {
        use vigil_alerts::{
            AlertRule, AlertingConfig, ChannelKind, ChannelRegistry, LogChannel, RuleSet,
        };

        let rule = AlertRule::builder("api", AlertSeverity::Critical)
            .channel(ChannelKind::Chat)
            .build()
            .unwrap();
        let mut registry = ChannelRegistry::new();
        registry.register(Arc::new(LogChannel::new("log", ChannelKind::Chat)));
        let service = Arc::new(AlertingService::new(
            AlertingConfig::default(),
            RuleSet::new(vec![rule]),
            registry,
        ));

        let api = endpoint("api");
        let monitor = UptimeMonitor::with_prober(
            vec![api.clone()],
            MonitorConfig::default(),
            Arc::clone(&service),
            Arc::new(ScriptedProber::new(vec![CheckResult::down(
                "api", 0, "refused",
            )])),
        );

        monitor.run_check_cycle(&api).await;
        let alerts = service.active_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].category, "api");
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    }
}
