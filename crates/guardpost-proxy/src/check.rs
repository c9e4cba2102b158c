//! Proxy health checking — one echo request through the relay.
//!
//! A check never returns Err: every failure mode (connect refused, auth
//! rejected, timeout) collapses into a DEAD `CheckResult`, so callers
//! can batch checks without per-item error plumbing.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use guardpost_core::types::{CheckResult, Proxy, ProxyStatus};

/// Seam for probing a proxy, so the pool is testable without sockets.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, proxy: &Proxy, timeout: Duration) -> CheckResult;
}

/// Body returned by the IP-echo endpoint.
#[derive(Debug, Deserialize)]
struct EchoBody {
    ip: String,
}

/// Production probe: GET an IP-echo endpoint through the proxy and
/// require HTTP 200 within the timeout.
pub struct HttpEchoProbe {
    echo_url: String,
}

impl HttpEchoProbe {
    pub fn new(echo_url: impl Into<String>) -> Self {
        Self { echo_url: echo_url.into() }
    }
}

#[async_trait]
impl HealthProbe for HttpEchoProbe {
    async fn probe(&self, proxy: &Proxy, timeout: Duration) -> CheckResult {
        let started = Instant::now();

        let outcome = async {
            let client = reqwest::Client::builder()
                .proxy(
                    reqwest::Proxy::all(proxy.http_url())
                        .map_err(|e| format!("bad proxy url: {e}"))?,
                )
                .timeout(timeout)
                .build()
                .map_err(|e| format!("client build: {e}"))?;

            let resp = client
                .get(&self.echo_url)
                .send()
                .await
                .map_err(|e| format!("{e}"))?;
            if !resp.status().is_success() {
                return Err(format!("echo endpoint returned {}", resp.status()));
            }
            let body: EchoBody = resp.json().await.map_err(|e| format!("{e}"))?;
            Ok(body.ip)
        }
        .await;

        let latency_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(ip) => CheckResult {
                proxy_id: proxy.id,
                success: true,
                egress_ip: Some(ip),
                latency_ms: Some(latency_ms),
                error: None,
                status: ProxyStatus::Active,
            },
            Err(error) => {
                tracing::warn!("Proxy {} check failed: {error}", proxy.id);
                CheckResult {
                    proxy_id: proxy.id,
                    success: false,
                    egress_ip: None,
                    latency_ms: None,
                    error: Some(error),
                    status: ProxyStatus::Dead,
                }
            }
        }
    }
}

/// Aggregate outcome of a pool-wide check.
#[derive(Debug, serde::Serialize)]
pub struct CheckSummary {
    pub total: usize,
    pub alive: usize,
    pub dead: usize,
    pub results: Vec<CheckResult>,
}
