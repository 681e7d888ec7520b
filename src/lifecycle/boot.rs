//! Boot Sequencer.
//!
//! # Responsibilities
//! - Verify the provider can serve block height, balance and pending nonce
//! - Retry the whole verification forever on any failure
//! - Hand back the values Account State is built from

use std::sync::Arc;

use alloy::primitives::{Address, U256};

use crate::account::AccountState;
use crate::blockchain::{BlockchainResult, NativeAmount};
use crate::observability::metrics;
use crate::provider::FailoverProvider;
use crate::resilience::RetryPolicy;

/// What a successful boot observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    pub block_number: u64,
    pub balance: U256,
    pub next_nonce: u64,
    /// Attempts taken, including the successful one.
    pub attempts: u32,
}

impl BootReport {
    pub fn into_account(self, address: Address) -> Arc<AccountState> {
        Arc::new(AccountState::new(address, self.balance, self.next_nonce))
    }
}

#[derive(Debug, Clone)]
pub struct BootSequencer {
    policy: RetryPolicy,
}

impl BootSequencer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run attempts until one succeeds. There is no attempt limit.
    pub async fn run(&self, provider: &FailoverProvider, address: Address) -> BootReport {
        let mut attempt = 0u32;

        loop {
            attempt = attempt.saturating_add(1);

            match Self::attempt(provider, address).await {
                Ok((block_number, balance, next_nonce)) => {
                    metrics::record_boot_attempt("ok");
                    tracing::info!(
                        attempt,
                        block_number,
                        balance = %NativeAmount::from_wei(balance),
                        next_nonce,
                        active_endpoints = provider.active_endpoints(),
                        "Boot complete"
                    );
                    return BootReport {
                        block_number,
                        balance,
                        next_nonce,
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    metrics::record_boot_attempt("failed");
                    let delay = self.policy.delay_for(attempt);
                    tracing::error!(attempt, error = %e, retry_in = ?delay, "Boot failed");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(
        provider: &FailoverProvider,
        address: Address,
    ) -> BlockchainResult<(u64, U256, u64)> {
        let block_number = provider.get_block_number().await?;
        let balance = provider.get_balance(address).await?;
        let next_nonce = provider.get_pending_nonce(address).await?;
        Ok((block_number, balance, next_nonce))
    }
}
