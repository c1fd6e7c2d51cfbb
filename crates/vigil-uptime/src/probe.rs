//! Probers: turn an endpoint definition into a check result.
//!
//! A prober never errors. Connection refusals, timeouts, DNS failures,
//! and wrong responses are all DOWN results; errors must not reach the
//! scheduling loops.

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::debug;

use crate::types::{CheckKind, CheckResult, EndpointCheck};

/// Capability for probing one endpoint.
///
/// Kept as a trait so monitor tests can substitute a scripted prober,
/// and so certificate-aware or driver-level probers can be plugged in
/// without touching the state machine.
pub trait Prober: Send + Sync + std::fmt::Debug {
    /// Probes `check` once.
    fn check<'a>(&'a self, check: &'a EndpointCheck) -> BoxFuture<'a, CheckResult>;
}

/// Network prober: HTTP via `reqwest`, TCP-family via raw connects.
///
/// HTTP evaluation order: status code, then body content, then latency.
/// `ssl_expiry_days` is left unset; certificate introspection needs a
/// prober with its own TLS stack.
#[derive(Debug, Clone, Default)]
pub struct NetProber {
    client: reqwest::Client,
}

impl NetProber {
    /// Creates a prober with a shared HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn check_http(&self, check: &EndpointCheck) -> CheckResult {
        let timeout = Duration::from_secs(check.timeout_secs);
        let started = Instant::now();

        let response = match self.client.get(&check.target).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                let elapsed = elapsed_ms(started);
                debug!(endpoint = %check.name, error = %e, "http probe failed");
                return CheckResult::down(&check.name, elapsed, e.to_string());
            }
        };

        let code = response.status().as_u16();
        let status_ok = if check.expected_status.is_empty() {
            response.status().is_success()
        } else {
            check.expected_status.contains(&code)
        };
        if !status_ok {
            let elapsed = elapsed_ms(started);
            return CheckResult::down(
                &check.name,
                elapsed,
                format!("unexpected status {code}"),
            )
            .with_status_code(code);
        }

        if let Some(needle) = &check.expected_content {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    let elapsed = elapsed_ms(started);
                    return CheckResult::down(&check.name, elapsed, e.to_string())
                        .with_status_code(code);
                }
            };
            if !body.contains(needle) {
                let elapsed = elapsed_ms(started);
                return CheckResult::down(
                    &check.name,
                    elapsed,
                    format!("body missing expected content '{needle}'"),
                )
                .with_status_code(code);
            }
        }

        let elapsed = elapsed_ms(started);
        let result = if check.expected_response_ms.is_some_and(|limit| elapsed > limit) {
            CheckResult::degraded(&check.name, elapsed)
        } else {
            CheckResult::up(&check.name, elapsed)
        };
        result.with_status_code(code)
    }

    async fn check_tcp(&self, check: &EndpointCheck) -> CheckResult {
        let timeout = Duration::from_secs(check.timeout_secs);
        let started = Instant::now();

        let connect = tokio::net::TcpStream::connect(&check.target);
        match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(_stream)) => {
                let elapsed = elapsed_ms(started);
                if check.expected_response_ms.is_some_and(|limit| elapsed > limit) {
                    CheckResult::degraded(&check.name, elapsed)
                } else {
                    CheckResult::up(&check.name, elapsed)
                }
            }
            Ok(Err(e)) => {
                let elapsed = elapsed_ms(started);
                debug!(endpoint = %check.name, error = %e, "tcp probe failed");
                CheckResult::down(&check.name, elapsed, e.to_string())
            }
            Err(_) => {
                let elapsed = elapsed_ms(started);
                CheckResult::down(
                    &check.name,
                    elapsed,
                    format!("connect timed out after {}s", check.timeout_secs),
                )
            }
        }
    }
}

impl Prober for NetProber {
    fn check<'a>(&'a self, check: &'a EndpointCheck) -> BoxFuture<'a, CheckResult> {
        Box::pin(async move {
            let result = match check.kind {
                CheckKind::Http => self.check_http(check).await,
                CheckKind::Tcp | CheckKind::Postgres | CheckKind::Redis => {
                    self.check_tcp(check).await
                }
            };
            debug!(
                endpoint = %check.name,
                status = %result.status,
                latency_ms = result.response_time_ms,
                "probe complete"
            );
            result
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EndpointCheck, EndpointStatus};

    fn tcp_check(target: &str) -> EndpointCheck {
        EndpointCheck::builder("db", target, CheckKind::Tcp)
            .timeout_secs(1)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn tcp_probe_reports_up_for_listening_socket() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let prober = NetProber::new();
        let result = prober.check(&tcp_check(&addr.to_string())).await;
        assert_eq!(result.status, EndpointStatus::Up);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn tcp_probe_reports_down_for_refused_connection() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = NetProber::new();
        let result = prober.check(&tcp_check(&addr.to_string())).await;
        assert_eq!(result.status, EndpointStatus::Down);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn tcp_probe_reports_down_for_unresolvable_host() {
        let prober = NetProber::new();
        let result = prober
            .check(&tcp_check("definitely-not-a-real-host.invalid:9"))
            .await;
        assert_eq!(result.status, EndpointStatus::Down);
    }
}
