//! The pool itself: batch checking and account↔proxy binding.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use guardpost_core::config::ProxyCheckConfig;
use guardpost_core::error::{GuardPostError, Result};
use guardpost_core::types::{CheckResult, Proxy, ProxyStatus};
use guardpost_store::Store;

use crate::check::{CheckSummary, HealthProbe};

/// How a proxy is picked for an account.
#[derive(Debug, Clone, Copy)]
pub enum ProxyChoice {
    /// A specific proxy the caller named.
    Explicit(i64),
    /// Any unbound ACTIVE proxy.
    Auto,
}

/// Tracks proxy health and bindings over the shared store.
pub struct ProxyPool {
    store: Arc<Store>,
    probe: Arc<dyn HealthProbe>,
    config: ProxyCheckConfig,
}

impl ProxyPool {
    pub fn new(store: Arc<Store>, probe: Arc<dyn HealthProbe>, config: ProxyCheckConfig) -> Self {
        Self { store, probe, config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.check_timeout_secs)
    }

    /// Insert a proxy, probing it first when `auto_check` is set so the
    /// stored status reflects reality from the start.
    pub async fn add_proxy(
        &self,
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        auto_check: bool,
    ) -> Result<(Proxy, Option<CheckResult>)> {
        let proxy = self
            .store
            .add_proxy(host, port, username, password, ProxyStatus::Dead)?;

        if !auto_check {
            return Ok((proxy, None));
        }

        let result = self.probe.probe(&proxy, self.timeout()).await;
        self.store.record_check(proxy.id, result.status, Utc::now())?;
        let proxy = self
            .store
            .get_proxy(proxy.id)?
            .ok_or_else(|| GuardPostError::NotFound(format!("proxy {}", proxy.id)))?;
        Ok((proxy, Some(result)))
    }

    /// Check one proxy and persist the outcome.
    pub async fn check_one(&self, proxy_id: i64) -> Result<CheckResult> {
        let proxy = self
            .store
            .get_proxy(proxy_id)?
            .ok_or_else(|| GuardPostError::NotFound(format!("proxy {proxy_id}")))?;
        let result = self.probe.probe(&proxy, self.timeout()).await;
        self.store.record_check(proxy.id, result.status, Utc::now())?;
        Ok(result)
    }

    /// Check every proxy in the pool, `check_concurrency` at a time.
    /// Fixed-size batches cap simultaneous outbound connections; each
    /// proxy's status and last-checked timestamp are persisted as its
    /// batch completes.
    pub async fn check_all(&self) -> Result<CheckSummary> {
        let proxies = self.store.list_proxies(None)?;
        let width = self.config.check_concurrency.max(1);
        let timeout = self.timeout();

        let mut results = Vec::with_capacity(proxies.len());
        for batch in proxies.chunks(width) {
            let checks = batch.iter().map(|proxy| self.probe.probe(proxy, timeout));
            let batch_results = futures::future::join_all(checks).await;
            for result in batch_results {
                self.store
                    .record_check(result.proxy_id, result.status, Utc::now())?;
                results.push(result);
            }
        }

        let alive = results.iter().filter(|r| r.success).count();
        let dead = results.len() - alive;
        tracing::info!(
            "Proxy sweep: {} checked, {alive} alive, {dead} dead",
            results.len()
        );
        Ok(CheckSummary { total: results.len(), alive, dead, results })
    }

    /// Bind a proxy to an account. Explicit choice fails NotFound if the
    /// proxy is absent and Conflict if bound elsewhere; Auto picks an
    /// arbitrary unbound ACTIVE proxy or fails NoProxyAvailable.
    pub fn assign(&self, account_id: i64, choice: ProxyChoice) -> Result<Proxy> {
        let proxy_id = match choice {
            ProxyChoice::Explicit(id) => id,
            ProxyChoice::Auto => self
                .store
                .find_free_active_proxy()?
                .ok_or(GuardPostError::NoProxyAvailable)?
                .id,
        };
        let proxy = self.store.bind_proxy(proxy_id, account_id)?;
        tracing::info!("Proxy {} bound to account {account_id}", proxy.id);
        Ok(proxy)
    }

    /// Release a binding. Required before the proxy can serve another
    /// account.
    pub fn unassign(&self, proxy_id: i64) -> Result<()> {
        self.store.unbind_proxy(proxy_id)
    }
}
