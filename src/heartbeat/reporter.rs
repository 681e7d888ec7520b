//! Heartbeat/Status Reporter.
//!
//! # Responsibilities
//! - Sample balance, nonce cursor and pool health on a fixed interval
//! - Serve the same sample on demand for the status endpoint
//! - Never fail: a failed sample reports zero balance and `degraded`

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::utils::format_units;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time;

use crate::account::AccountState;
use crate::blockchain::NativeAmount;
use crate::observability::metrics;
use crate::provider::FailoverProvider;

/// One observation of the agent's account and endpoint pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub wallet_balance: NativeAmount,
    pub next_nonce: u64,
    pub active_endpoints: usize,
    pub endpoint_pool_size: usize,
    /// Balance could not be sampled or the provider is below quorum.
    pub degraded: bool,
}

pub struct StatusReporter {
    provider: Arc<FailoverProvider>,
    account: Arc<AccountState>,
    interval: Duration,
}

impl StatusReporter {
    pub fn new(provider: Arc<FailoverProvider>, account: Arc<AccountState>, interval: Duration) -> Self {
        Self {
            provider,
            account,
            interval,
        }
    }

    /// Refresh the balance through the provider and snapshot everything else.
    pub async fn sample(&self) -> StatusSnapshot {
        let (wallet_balance, sampled) = match self.account.refresh_balance(&self.provider).await {
            Ok(balance) => (balance, true),
            Err(e) => {
                tracing::warn!(error = %e, "Balance sample failed");
                (NativeAmount::ZERO, false)
            }
        };

        StatusSnapshot {
            wallet_balance,
            next_nonce: self.account.next_nonce(),
            active_endpoints: self.provider.active_endpoints(),
            endpoint_pool_size: self.provider.pool_size(),
            degraded: !sampled || !self.provider.is_usable(),
        }
    }

    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Heartbeat starting");
        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = self.sample().await;
                    report(&snapshot);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Heartbeat received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

fn report(snapshot: &StatusSnapshot) {
    let balance = format_units(snapshot.wallet_balance.wei(), "ether")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    metrics::record_wallet_balance(balance);

    if snapshot.degraded {
        tracing::warn!(
            balance = %snapshot.wallet_balance,
            next_nonce = snapshot.next_nonce,
            active_endpoints = snapshot.active_endpoints,
            pool_size = snapshot.endpoint_pool_size,
            "Heartbeat (degraded)"
        );
    } else {
        tracing::info!(
            balance = %snapshot.wallet_balance,
            next_nonce = snapshot.next_nonce,
            active_endpoints = snapshot.active_endpoints,
            pool_size = snapshot.endpoint_pool_size,
            "Heartbeat"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    #[tokio::test]
    async fn test_failed_sample_reports_zero_and_degraded() {
        let provider = Arc::new(FailoverProvider::new(Vec::new(), 1));
        let account = Arc::new(AccountState::new(
            Address::ZERO,
            U256::from(10u64).pow(U256::from(18u64)),
            12,
        ));
        let reporter = StatusReporter::new(provider, account.clone(), Duration::from_secs(60));

        let snapshot = reporter.sample().await;
        assert_eq!(snapshot.wallet_balance, NativeAmount::ZERO);
        assert_eq!(snapshot.next_nonce, 12);
        assert_eq!(snapshot.endpoint_pool_size, 0);
        assert!(snapshot.degraded);
        // The cached balance is left alone on failure.
        assert_eq!(account.cached_balance(), NativeAmount::from_whole(1));
    }
}
