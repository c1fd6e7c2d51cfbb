//! Per-endpoint state machine: transitions, failure hysteresis,
//! incident lifecycle, and the mapping to alert events.
//!
//! `observe` is pure bookkeeping over one check result; it never
//! performs I/O. The monitor feeds results in and forwards the emitted
//! events to the alerting service.

use vigil_alerts::{AlertEvent, AlertSeverity};

use crate::types::{CheckResult, EndpointCheck, EndpointStatus, Incident};

/// Consecutive DOWN results before the hysteresis event fires.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Something noteworthy observed about an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    /// The endpoint moved between statuses.
    StatusChanged {
        /// Previous status; `None` on the first observation.
        from: Option<EndpointStatus>,
        /// New status.
        to: EndpointStatus,
        /// Failure description, for transitions into DOWN.
        error: Option<String>,
    },
    /// The failure counter crossed the hysteresis threshold.
    ConsecutiveFailures {
        /// Number of consecutive DOWN results.
        count: u32,
    },
    /// The endpoint recovered from DOWN; the incident is closed.
    Recovered {
        /// The closed incident record.
        incident: Incident,
    },
}

/// State machine for a single endpoint.
#[derive(Debug, Clone)]
pub struct EndpointState {
    last_status: Option<EndpointStatus>,
    consecutive_failures: u32,
    failure_threshold: u32,
    open_incident: Option<Incident>,
}

impl Default for EndpointState {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD)
    }
}

impl EndpointState {
    /// Creates a state machine with the given hysteresis threshold.
    #[must_use]
    pub const fn new(failure_threshold: u32) -> Self {
        Self {
            last_status: None,
            consecutive_failures: 0,
            failure_threshold,
            open_incident: None,
        }
    }

    /// Last observed status.
    #[must_use]
    pub const fn status(&self) -> Option<EndpointStatus> {
        self.last_status
    }

    /// Current consecutive-failure count.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// The incident currently open, if the endpoint is DOWN.
    #[must_use]
    pub const fn open_incident(&self) -> Option<&Incident> {
        self.open_incident.as_ref()
    }

    /// Folds one check result into the state.
    ///
    /// MAINTENANCE results are ignored entirely; a deliberately
    /// offline endpoint neither opens incidents nor resets hysteresis.
    pub fn observe(&mut self, result: &CheckResult) -> Vec<ProbeEvent> {
        if result.status == EndpointStatus::Maintenance {
            return Vec::new();
        }

        let mut events = Vec::new();
        let previous = self.last_status;

        if result.status == EndpointStatus::Down {
            self.consecutive_failures += 1;
            if self.consecutive_failures == self.failure_threshold {
                events.push(ProbeEvent::ConsecutiveFailures {
                    count: self.consecutive_failures,
                });
            }
        } else {
            self.consecutive_failures = 0;
        }

        if previous != Some(result.status) {
            match result.status {
                EndpointStatus::Down => {
                    self.open_incident = Some(Incident::open(
                        result.endpoint.clone(),
                        result.error.clone(),
                    ));
                    events.insert(
                        0,
                        ProbeEvent::StatusChanged {
                            from: previous,
                            to: EndpointStatus::Down,
                            error: result.error.clone(),
                        },
                    );
                }
                EndpointStatus::Up | EndpointStatus::Degraded => {
                    if let Some(mut incident) = self.open_incident.take() {
                        incident.close(result.timestamp);
                        events.push(ProbeEvent::Recovered { incident });
                    } else if previous.is_some() {
                        // UP <-> DEGRADED, no incident involved
                        events.push(ProbeEvent::StatusChanged {
                            from: previous,
                            to: result.status,
                            error: None,
                        });
                    }
                }
                EndpointStatus::Maintenance => {}
            }
            self.last_status = Some(result.status);
        }

        events
    }
}

/// Maps a probe event to the alert event submitted to the alerting
/// pipeline.
///
/// Severity: DOWN on a critical endpoint is Critical, otherwise
/// Warning; recovery is Info. Category is the endpoint name so
/// per-endpoint rules can match on it.
#[must_use]
pub fn to_alert_event(check: &EndpointCheck, event: &ProbeEvent) -> AlertEvent {
    let down_severity = if check.critical {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warning
    };

    let alert = match event {
        ProbeEvent::StatusChanged { from, to, error } => {
            let severity = match to {
                EndpointStatus::Down => down_severity,
                _ => AlertSeverity::Warning,
            };
            let description = match error {
                Some(e) => format!("{} is {to}: {e}", check.name),
                None => format!(
                    "{} went from {} to {to}",
                    check.name,
                    from.map_or("unknown", |s| s.as_str()),
                ),
            };
            AlertEvent::new(
                format!("{} is {}", check.name, to.as_str().to_uppercase()),
                severity,
                "uptime",
                check.name.clone(),
            )
            .with_description(description)
        }
        ProbeEvent::ConsecutiveFailures { count } => AlertEvent::new(
            format!("{} failing repeatedly", check.name),
            down_severity,
            "uptime",
            check.name.clone(),
        )
        .with_description(format!("{} consecutive failed checks", count))
        .with_tag("consecutive-failures")
        .with_metadata("consecutive_failures", count.to_string()),
        ProbeEvent::Recovered { incident } => AlertEvent::new(
            format!("{} recovered", check.name),
            AlertSeverity::Info,
            "uptime",
            check.name.clone(),
        )
        .with_description(format!(
            "{} was down for {}s",
            check.name,
            incident.duration_secs()
        ))
        .with_tag("recovery")
        .with_metadata("incident_id", incident.id.to_string())
        .with_metadata("downtime_secs", incident.duration_secs().to_string()),
    };

    alert
        .with_tag("uptime")
        .with_tag(check.kind.as_str())
        .with_metadata("endpoint", check.name.clone())
        .with_metadata("target", check.target.clone())
}
