//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every pool endpoint with `eth_blockNumber`
//! - Feed results into the endpoint health state so degraded endpoints recover
//!   without waiting for live traffic

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::provider::FailoverProvider;

pub struct HealthMonitor {
    provider: Arc<FailoverProvider>,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(provider: Arc<FailoverProvider>, interval: Duration) -> Self {
        Self { provider, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = ?self.interval,
            endpoints = self.provider.pool_size(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; boot has just probed the pool.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every endpoint once, in pool order.
    pub async fn check_all(&self) {
        for endpoint in self.provider.endpoints() {
            let probe = endpoint.rpc();
            let healthy = match time::timeout(endpoint.liveness_timeout(), probe.block_number()).await {
                Ok(Ok(block)) => {
                    tracing::trace!(endpoint = %endpoint.label(), block, "Health probe ok");
                    true
                }
                Ok(Err(e)) => {
                    tracing::warn!(endpoint = %endpoint.label(), error = %e, "Health probe failed");
                    false
                }
                Err(_) => {
                    tracing::warn!(endpoint = %endpoint.label(), "Health probe failed: timeout");
                    false
                }
            };

            self.provider.record_outcome(endpoint, healthy);
        }

        tracing::debug!(
            active = self.provider.active_endpoints(),
            pool_size = self.provider.pool_size(),
            "Health probe round complete"
        );
    }
}
