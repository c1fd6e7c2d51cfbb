//! Alert and incident lifecycle engine for Vigil.
//!
//! `vigil-alerts` takes raw [`AlertEvent`]s (from uptime probes, metric
//! evaluators, or any other producer), decides whether they should
//! notify anyone, fans delivery out across notification channels, and
//! tracks the resulting alerts until someone acknowledges or resolves
//! them.
//!
//! # Pipeline
//!
//! Every event runs through [`AlertingService::submit`] in strict
//! stage order:
//!
//! 1. **Suppression** — maintenance mode, maintenance window, or a
//!    deployment in progress drops the event before anything else.
//! 2. **Rule matching** — a pluggable [`RuleMatcher`] strategy selects
//!    the [`AlertRule`]s that apply.
//! 3. **Cooldown** — repeats of the same `source:category:title` inside
//!    the matched rules' minimum cooldown are dropped.
//! 4. **Dispatch** — the union of the matched rules' channels is
//!    notified concurrently, each under a timeout; delivery counts as
//!    successful when a strict majority of channels succeed.
//! 5. **Persistence and escalation** — the alert is stored, and an
//!    escalation timer is armed that re-submits a severity-bumped
//!    event if nobody acknowledges in time.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vigil_alerts::{
//!     AlertEvent, AlertRule, AlertSeverity, AlertingConfig, AlertingService,
//!     ChannelKind, ChannelRegistry, LogChannel, RuleSet,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> vigil_alerts::Result<()> {
//! let rule = AlertRule::builder("api", AlertSeverity::Critical)
//!     .channel(ChannelKind::Chat)
//!     .cooldown_minutes(5)
//!     .build()?;
//!
//! let mut registry = ChannelRegistry::new();
//! registry.register(Arc::new(LogChannel::new("dev-log", ChannelKind::Chat)));
//!
//! let service = AlertingService::new(
//!     AlertingConfig::default(),
//!     RuleSet::new(vec![rule]),
//!     registry,
//! );
//!
//! let event = AlertEvent::new(
//!     "api is down",
//!     AlertSeverity::Critical,
//!     "uptime",
//!     "api",
//! );
//! let outcome = service.submit(event).await;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod escalation;
pub mod rules;
pub mod service;
pub mod store;
pub mod suppression;
pub mod types;

// Re-export main types at crate root
pub use channels::{ChannelKind, ChannelRegistry, LogChannel, NotificationChannel};
pub use config::AlertingConfig;
pub use dispatch::{DispatchOutcome, Dispatcher, DispatcherConfig};
pub use error::{AlertError, Result};
pub use escalation::{EscalationConfig, EscalationScheduler};
pub use rules::{AlertRule, AlertRuleBuilder, RuleMatcher, RuleSet, SubstringMatcher, TagMatcher};
pub use service::{AlertingService, ServiceStats, SubmitOutcome};
pub use store::{IncidentStore, StoreCounts};
pub use suppression::{CooldownTracker, MaintenanceWindow, SuppressionPolicy};
pub use types::{Alert, AlertEvent, AlertSeverity, AlertStatus};
