//! Core data model: endpoint definitions, check results, incidents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, UptimeError};

/// Default SLA target in percent.
pub const DEFAULT_SLA_TARGET: f64 = 99.9;

/// Probe protocol for an endpoint.
///
/// Postgres and Redis are TCP-connect probes against the service port;
/// driver-level health checks are external collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// HTTP(S) GET with status/content/latency evaluation.
    Http,
    /// Plain TCP connect.
    Tcp,
    /// TCP connect to a Postgres port.
    Postgres,
    /// TCP connect to a Redis port.
    Redis,
}

impl CheckKind {
    /// String form used in tags and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Tcp => "tcp",
            Self::Postgres => "postgres",
            Self::Redis => "redis",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed status of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    /// Responding as expected.
    Up,
    /// Not responding, or responding wrongly.
    Down,
    /// Responding, but slower than the configured threshold.
    Degraded,
    /// Deliberately offline; excluded from scheduling and statistics.
    Maintenance,
}

impl EndpointStatus {
    /// String form used in tags and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Degraded => "degraded",
            Self::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of one monitored endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointCheck {
    /// Unique endpoint name; used as the alert category.
    pub name: String,
    /// URL (HTTP) or `host:port` (TCP-family) target.
    pub target: String,
    /// Probe protocol.
    pub kind: CheckKind,
    /// Seconds between probes.
    pub interval_secs: u64,
    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,
    /// Acceptable HTTP status codes; empty means any 2xx.
    pub expected_status: Vec<u16>,
    /// Latency above this many milliseconds marks the check DEGRADED.
    pub expected_response_ms: Option<u64>,
    /// Substring the HTTP response body must contain.
    pub expected_content: Option<String>,
    /// Critical endpoints raise Critical alerts when DOWN.
    pub critical: bool,
    /// SLA target in percent over the rolling window.
    pub sla_target: f64,
    /// Disabled endpoints are not scheduled.
    pub enabled: bool,
}

impl EndpointCheck {
    /// Starts building an endpoint definition.
    pub fn builder(
        name: impl Into<String>,
        target: impl Into<String>,
        kind: CheckKind,
    ) -> EndpointCheckBuilder {
        EndpointCheckBuilder::new(name, target, kind)
    }
}

/// Builder for [`EndpointCheck`] with validation at `build`.
#[derive(Debug, Clone)]
pub struct EndpointCheckBuilder {
    name: String,
    target: String,
    kind: CheckKind,
    interval_secs: u64,
    timeout_secs: u64,
    expected_status: Vec<u16>,
    expected_response_ms: Option<u64>,
    expected_content: Option<String>,
    critical: bool,
    sla_target: f64,
    enabled: bool,
}

impl EndpointCheckBuilder {
    fn new(name: impl Into<String>, target: impl Into<String>, kind: CheckKind) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind,
            interval_secs: 60,
            timeout_secs: 10,
            expected_status: Vec::new(),
            expected_response_ms: None,
            expected_content: None,
            critical: false,
            sla_target: DEFAULT_SLA_TARGET,
            enabled: true,
        }
    }

    /// Sets seconds between probes.
    #[must_use]
    pub const fn interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    /// Sets the per-probe timeout in seconds.
    #[must_use]
    pub const fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Adds an acceptable HTTP status code.
    #[must_use]
    pub fn expect_status(mut self, code: u16) -> Self {
        self.expected_status.push(code);
        self
    }

    /// Sets the latency threshold for DEGRADED, in milliseconds.
    #[must_use]
    pub const fn expect_response_ms(mut self, ms: u64) -> Self {
        self.expected_response_ms = Some(ms);
        self
    }

    /// Sets a substring the HTTP response body must contain.
    #[must_use]
    pub fn expect_content(mut self, needle: impl Into<String>) -> Self {
        self.expected_content = Some(needle.into());
        self
    }

    /// Marks the endpoint as critical.
    #[must_use]
    pub const fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// Sets the SLA target in percent.
    #[must_use]
    pub const fn sla_target(mut self, percent: f64) -> Self {
        self.sla_target = percent;
        self
    }

    /// Sets whether the endpoint is scheduled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builds the [`EndpointCheck`].
    ///
    /// # Errors
    ///
    /// Returns `UptimeError::InvalidEndpoint` for an empty name or
    /// target, a zero interval, or an SLA target outside (0, 100].
    pub fn build(self) -> Result<EndpointCheck> {
        if self.name.is_empty() {
            return Err(UptimeError::InvalidEndpoint {
                reason: "name cannot be empty".to_string(),
            });
        }
        if self.target.is_empty() {
            return Err(UptimeError::InvalidEndpoint {
                reason: format!("endpoint '{}' has no target", self.name),
            });
        }
        if self.interval_secs == 0 {
            return Err(UptimeError::InvalidEndpoint {
                reason: format!("endpoint '{}' has zero interval", self.name),
            });
        }
        if !(self.sla_target > 0.0 && self.sla_target <= 100.0) {
            return Err(UptimeError::InvalidEndpoint {
                reason: format!(
                    "endpoint '{}' has sla target {} outside (0, 100]",
                    self.name, self.sla_target
                ),
            });
        }

        Ok(EndpointCheck {
            name: self.name,
            target: self.target,
            kind: self.kind,
            interval_secs: self.interval_secs,
            timeout_secs: self.timeout_secs,
            expected_status: self.expected_status,
            expected_response_ms: self.expected_response_ms,
            expected_content: self.expected_content,
            critical: self.critical,
            sla_target: self.sla_target,
            enabled: self.enabled,
        })
    }
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Endpoint name.
    pub endpoint: String,
    /// When the probe completed.
    pub timestamp: DateTime<Utc>,
    /// Observed status.
    pub status: EndpointStatus,
    /// Round-trip latency in milliseconds.
    pub response_time_ms: u64,
    /// HTTP status code, when applicable.
    pub status_code: Option<u16>,
    /// Failure description for DOWN results.
    pub error: Option<String>,
    /// Days until TLS certificate expiry, when a prober provides it.
    pub ssl_expiry_days: Option<i64>,
}

impl CheckResult {
    /// A successful probe.
    #[must_use]
    pub fn up(endpoint: impl Into<String>, response_time_ms: u64) -> Self {
        Self::with_status(endpoint, EndpointStatus::Up, response_time_ms)
    }

    /// A probe that responded, but too slowly.
    #[must_use]
    pub fn degraded(endpoint: impl Into<String>, response_time_ms: u64) -> Self {
        Self::with_status(endpoint, EndpointStatus::Degraded, response_time_ms)
    }

    /// A failed probe.
    #[must_use]
    pub fn down(
        endpoint: impl Into<String>,
        response_time_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::with_status(endpoint, EndpointStatus::Down, response_time_ms);
        result.error = Some(error.into());
        result
    }

    fn with_status(
        endpoint: impl Into<String>,
        status: EndpointStatus,
        response_time_ms: u64,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            timestamp: Utc::now(),
            status,
            response_time_ms,
            status_code: None,
            error: None,
            ssl_expiry_days: None,
        }
    }

    /// Attaches the HTTP status code.
    #[must_use]
    pub const fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }
}

/// A contiguous span during which an endpoint was DOWN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique incident id.
    pub id: Uuid,
    /// Endpoint name.
    pub endpoint: String,
    /// When the endpoint went DOWN.
    pub started_at: DateTime<Utc>,
    /// When the endpoint recovered; `None` while still open.
    pub ended_at: Option<DateTime<Utc>>,
    /// Failure description from the probe that opened the incident.
    pub error: Option<String>,
}

impl Incident {
    /// Opens a new incident starting now.
    #[must_use]
    pub fn open(endpoint: impl Into<String>, error: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint: endpoint.into(),
            started_at: Utc::now(),
            ended_at: None,
            error,
        }
    }

    /// Returns true while the incident has no end time.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Stamps the recovery time.
    pub fn close(&mut self, at: DateTime<Utc>) {
        self.ended_at = Some(at);
    }

    /// Duration of the incident in seconds, never negative.
    ///
    /// Open incidents measure against the current time.
    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        let secs = (end - self.started_at).num_seconds();
        u64::try_from(secs).unwrap_or(0)
    }
}
