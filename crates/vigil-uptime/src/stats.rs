//! Rolling result windows and uptime/SLA statistics.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::types::{CheckResult, EndpointStatus};

/// How long results are retained in the rolling window.
pub const WINDOW_HOURS: i64 = 24;

/// Per-endpoint rolling window of check results.
///
/// Results older than [`WINDOW_HOURS`] are pruned on every push, so
/// the window never grows past one day of probes.
#[derive(Debug, Clone, Default)]
pub struct ResultWindow {
    results: VecDeque<CheckResult>,
}

impl ResultWindow {
    /// Creates an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result and prunes entries past the retention horizon.
    pub fn push(&mut self, result: CheckResult) {
        self.results.push_back(result);
        let horizon = Utc::now() - Duration::hours(WINDOW_HOURS);
        while self.results.front().is_some_and(|r| r.timestamp < horizon) {
            self.results.pop_front();
        }
    }

    /// Snapshot of the retained results, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CheckResult> {
        self.results.iter().cloned().collect()
    }

    /// Number of retained results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if the window holds no results.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Uptime statistics over a result window.
#[derive(Debug, Clone, Serialize)]
pub struct UptimeStats {
    /// Endpoint name.
    pub endpoint: String,
    /// Uptime percentage; MAINTENANCE results are excluded from the
    /// denominator. 100.0 when no counted results exist.
    pub uptime_percent: f64,
    /// Counted results (everything but MAINTENANCE).
    pub total_checks: usize,
    /// UP results.
    pub up_checks: usize,
    /// DEGRADED results.
    pub degraded_checks: usize,
    /// DOWN results.
    pub down_checks: usize,
    /// Mean latency in milliseconds over counted results.
    pub avg_response_ms: f64,
    /// Consecutive UP results at the tail of the window.
    pub current_up_streak: usize,
    /// Longest contiguous DOWN span, in seconds.
    pub longest_downtime_secs: u64,
    /// Configured SLA target in percent.
    pub sla_target: f64,
    /// True when `uptime_percent >= sla_target`.
    pub sla_compliant: bool,
    /// When the statistics were computed.
    pub computed_at: DateTime<Utc>,
}

impl UptimeStats {
    /// Computes statistics over `results` (chronological order) against
    /// the given SLA target.
    ///
    /// UP and DEGRADED both count as available: a slow endpoint is not
    /// a down endpoint.
    #[must_use]
    pub fn compute(endpoint: impl Into<String>, results: &[CheckResult], sla_target: f64) -> Self {
        let counted: Vec<&CheckResult> = results
            .iter()
            .filter(|r| r.status != EndpointStatus::Maintenance)
            .collect();

        let total = counted.len();
        let up = counted
            .iter()
            .filter(|r| r.status == EndpointStatus::Up)
            .count();
        let degraded = counted
            .iter()
            .filter(|r| r.status == EndpointStatus::Degraded)
            .count();
        let down = counted
            .iter()
            .filter(|r| r.status == EndpointStatus::Down)
            .count();

        let uptime_percent = if total == 0 {
            100.0
        } else {
            ((up + degraded) as f64 / total as f64) * 100.0
        };

        let avg_response_ms = if total == 0 {
            0.0
        } else {
            counted.iter().map(|r| r.response_time_ms as f64).sum::<f64>() / total as f64
        };

        let current_up_streak = counted
            .iter()
            .rev()
            .take_while(|r| r.status == EndpointStatus::Up)
            .count();

        Self {
            endpoint: endpoint.into(),
            uptime_percent,
            total_checks: total,
            up_checks: up,
            degraded_checks: degraded,
            down_checks: down,
            avg_response_ms,
            current_up_streak,
            longest_downtime_secs: longest_downtime_secs(&counted),
            sla_target,
            sla_compliant: uptime_percent >= sla_target,
            computed_at: Utc::now(),
        }
    }
}

/// Longest contiguous span of DOWN results, measured from the first to
/// the last timestamp of each run.
fn longest_downtime_secs(counted: &[&CheckResult]) -> u64 {
    let mut longest: i64 = 0;
    let mut run_start: Option<DateTime<Utc>> = None;
    let mut run_end: Option<DateTime<Utc>> = None;

    for result in counted {
        if result.status == EndpointStatus::Down {
            if run_start.is_none() {
                run_start = Some(result.timestamp);
            }
            run_end = Some(result.timestamp);
        } else {
            if let (Some(start), Some(end)) = (run_start, run_end) {
                longest = longest.max((end - start).num_seconds());
            }
            run_start = None;
            run_end = None;
        }
    }
    if let (Some(start), Some(end)) = (run_start, run_end) {
        longest = longest.max((end - start).num_seconds());
    }

    u64::try_from(longest).unwrap_or(0)
}
