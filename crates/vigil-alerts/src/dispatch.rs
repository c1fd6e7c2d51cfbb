//! Concurrent multi-channel dispatch.
//!
//! One alert fans out to the union of channels named by its matching
//! rules. Sends run concurrently, each under a bounded timeout, and a
//! channel failure never aborts the fan-out. Delivery is successful
//! overall only when strictly more than half the attempted channels
//! succeed; the asymmetric threshold lets a single misconfigured
//! channel outage not mask delivery through the remaining majority.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::channels::{ChannelKind, ChannelRegistry};
use crate::types::Alert;

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Bound on each individual channel send.
    pub channel_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channel_timeout: Duration::from_secs(10),
        }
    }
}

/// The per-channel results of one fan-out.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// Channels attempted (the rule union).
    pub attempted: usize,
    /// Channels that confirmed delivery within the timeout.
    pub successes: usize,
    /// Per-kind result, in fan-out order.
    pub results: Vec<(ChannelKind, bool)>,
}

impl DispatchOutcome {
    /// Overall success: strictly more than half the attempted channels
    /// succeeded. Zero attempted channels is never a success.
    #[must_use]
    pub const fn delivered(&self) -> bool {
        self.successes * 2 > self.attempted
    }
}

/// Fans alerts out to registered channels concurrently.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ChannelRegistry>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Creates a dispatcher over a registry.
    #[must_use]
    pub fn new(registry: Arc<ChannelRegistry>, config: DispatcherConfig) -> Self {
        Self { registry, config }
    }

    /// Sends `alert` to every kind in `kinds` concurrently.
    ///
    /// A kind with no registered channel, a disabled channel, a send
    /// error, and a timeout all count as failures; none of them stops
    /// the other sends.
    pub async fn dispatch(&self, alert: &Alert, kinds: &[ChannelKind]) -> DispatchOutcome {
        let sends = kinds.iter().map(|&kind| {
            let timeout = self.config.channel_timeout;
            async move {
                let channel = match self.registry.get(kind) {
                    Ok(channel) => channel,
                    Err(e) => {
                        warn!(alert_id = %alert.id, kind = %kind, error = %e, "no channel registered");
                        return (kind, false);
                    }
                };

                if !channel.is_enabled() {
                    debug!(alert_id = %alert.id, channel = %channel.name(), "channel disabled");
                    return (kind, false);
                }

                match tokio::time::timeout(timeout, channel.send(alert)).await {
                    Ok(Ok(())) => (kind, true),
                    Ok(Err(e)) => {
                        warn!(
                            alert_id = %alert.id,
                            channel = %channel.name(),
                            error = %e,
                            "channel send failed"
                        );
                        (kind, false)
                    }
                    Err(_) => {
                        warn!(
                            alert_id = %alert.id,
                            channel = %channel.name(),
                            timeout_secs = timeout.as_secs(),
                            "channel send timed out"
                        );
                        (kind, false)
                    }
                }
            }
        });

        let results = join_all(sends).await;
        let successes = results.iter().filter(|(_, ok)| *ok).count();

        DispatchOutcome {
            attempted: kinds.len(),
            successes,
            results,
        }
    }
}
