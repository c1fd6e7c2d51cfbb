//! Endpoint uptime monitoring for Vigil.
//!
//! `vigil-uptime` probes HTTP and TCP-family endpoints on per-endpoint
//! intervals, runs each result through a hysteresis state machine, and
//! feeds the noteworthy transitions into the `vigil-alerts` pipeline as
//! alert events. It keeps a 24-hour rolling window of results per
//! endpoint for uptime and SLA statistics, and records every DOWN span
//! as an incident.
//!
//! # Flow
//!
//! ```text
//! EndpointCheck --probe--> CheckResult --observe--> ProbeEvent
//!                                 |                     |
//!                           ResultWindow          AlertEvent --> sink
//! ```
//!
//! The monitor never decides who gets paged; it only reports what it
//! saw. Suppression, cooldown, rule matching, and channel fan-out all
//! happen downstream in the alerting service.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vigil_alerts::{AlertingConfig, AlertingService, ChannelRegistry, RuleSet};
//! use vigil_uptime::{CheckKind, EndpointCheck, MonitorConfig, UptimeMonitor};
//!
//! # #[tokio::main]
//! # async fn main() -> vigil_uptime::Result<()> {
//! let api = EndpointCheck::builder("api", "https://example.com/health", CheckKind::Http)
//!     .interval_secs(30)
//!     .critical(true)
//!     .build()?;
//!
//! let service = Arc::new(AlertingService::new(
//!     AlertingConfig::default(),
//!     RuleSet::new(Vec::new()),
//!     ChannelRegistry::new(),
//! ));
//!
//! let monitor = UptimeMonitor::new(vec![api], MonitorConfig::default(), service);
//! monitor.spawn_probes();
//! monitor.spawn_evaluators();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod monitor;
pub mod probe;
pub mod state;
pub mod stats;
pub mod types;

// Re-export main types at crate root
pub use error::{Result, UptimeError};
pub use monitor::{EventSink, MonitorConfig, UptimeMonitor};
pub use probe::{NetProber, Prober};
pub use state::{DEFAULT_FAILURE_THRESHOLD, EndpointState, ProbeEvent, to_alert_event};
pub use stats::{ResultWindow, UptimeStats};
pub use types::{CheckKind, CheckResult, EndpointCheck, EndpointCheckBuilder, EndpointStatus, Incident};
