//! Transaction construction, signing and submission.
//!
//! # Responsibilities
//! - Apply the local guards before spending a nonce
//! - Reserve nonces through the single shared cursor
//! - Build, sign and broadcast type-2 transactions
//! - Classify failures (nonce conflict vs. everything else)
//! - Optionally wait for confirmation off the hot path

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use tokio::time::{interval, timeout};
use tracing::Instrument;
use uuid::Uuid;

use crate::account::AccountState;
use crate::blockchain::contract::encode_strike_call;
use crate::blockchain::{
    BlockchainError, BlockchainResult, ConfirmationStatus, NativeAmount, PendingCandidate, Wallet,
};
use crate::config::{StrikeConfig, WithdrawConfig};
use crate::issuer::fees::FeePolicy;
use crate::issuer::withdraw::WithdrawRequest;
use crate::observability::metrics;
use crate::provider::FailoverProvider;

const EIP1559_TX_TYPE: u8 = 2;
const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Which path produced an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOrigin {
    /// A mempool candidate accepted by the trigger predicate.
    Trigger,
    /// An operator withdrawal request.
    Operator,
}

impl IntentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentOrigin::Trigger => "strike",
            IntentOrigin::Operator => "withdraw",
        }
    }
}

/// What to send, before a nonce and fees are attached.
#[derive(Debug, Clone)]
pub struct TxIntent {
    pub origin: IntentOrigin,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
    pub gas_limit: u64,
    pub fees: FeePolicy,
}

/// Handle for a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedTx {
    pub hash: TxHash,
    pub nonce: u64,
    pub origin: IntentOrigin,
}

/// Why a candidate did not lead to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoRecipient,
    BelowTriggerValue {
        value: NativeAmount,
        threshold: NativeAmount,
    },
    BalanceBelowFloor {
        balance: NativeAmount,
        floor: NativeAmount,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoRecipient => f.write_str("candidate has no recipient"),
            SkipReason::BelowTriggerValue { value, threshold } => {
                write!(f, "value {} below trigger threshold {}", value, threshold)
            }
            SkipReason::BalanceBelowFloor { balance, floor } => {
                write!(f, "balance {} below floor {}", balance, floor)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrikeOutcome {
    Submitted(SubmittedTx),
    Skipped(SkipReason),
}

/// Sole owner of nonce reservation for the signing account.
///
/// Trigger strikes and operator withdrawals both go through [`TxIssuer::issue`].
pub struct TxIssuer {
    provider: Arc<FailoverProvider>,
    account: Arc<AccountState>,
    wallet: Wallet,
    strike: StrikeConfig,
    withdraw: WithdrawConfig,
}

impl TxIssuer {
    pub fn new(
        provider: Arc<FailoverProvider>,
        account: Arc<AccountState>,
        wallet: Wallet,
        strike: StrikeConfig,
        withdraw: WithdrawConfig,
    ) -> Self {
        Self {
            provider,
            account,
            wallet,
            strike,
            withdraw,
        }
    }

    pub fn account(&self) -> &Arc<AccountState> {
        &self.account
    }

    /// Local guards for a trigger candidate. `None` means go.
    pub fn check_candidate(&self, candidate: &PendingCandidate) -> Option<SkipReason> {
        if candidate.recipient.is_none() {
            return Some(SkipReason::NoRecipient);
        }

        let value = NativeAmount::from_wei(candidate.value);
        if value < self.strike.min_trigger_value {
            return Some(SkipReason::BelowTriggerValue {
                value,
                threshold: self.strike.min_trigger_value,
            });
        }

        let balance = self.account.cached_balance();
        if balance < self.strike.min_balance {
            return Some(SkipReason::BalanceBelowFloor {
                balance,
                floor: self.strike.min_balance,
            });
        }

        None
    }

    /// React to a triggered candidate by calling the strike contract.
    pub async fn strike(&self, candidate: &PendingCandidate) -> BlockchainResult<StrikeOutcome> {
        if let Some(reason) = self.check_candidate(candidate) {
            tracing::debug!(candidate = %candidate.hash, reason = %reason, "Candidate skipped");
            return Ok(StrikeOutcome::Skipped(reason));
        }

        let intent = TxIntent {
            origin: IntentOrigin::Trigger,
            to: self.strike.contract_address,
            value: U256::ZERO,
            input: encode_strike_call(
                self.strike.token_in,
                self.strike.token_out,
                self.strike.amount.wei(),
            ),
            gas_limit: self.strike.gas_limit,
            fees: FeePolicy::from_strike(&self.strike),
        };

        tracing::info!(
            candidate = %candidate.hash,
            value = %NativeAmount::from_wei(candidate.value),
            "Strike triggered"
        );

        let submitted = self.issue(intent).await?;

        if self.strike.confirmations > 0 {
            let provider = self.provider.clone();
            let required = self.strike.confirmations;
            let limit = Duration::from_secs(self.strike.confirmation_timeout_secs);
            tokio::spawn(async move {
                match wait_for_confirmation(&provider, submitted.hash, required, limit).await {
                    Ok(ConfirmationStatus::Confirmed { block_number }) => {
                        tracing::info!(tx_hash = %submitted.hash, block_number, "Strike confirmed");
                    }
                    Ok(status) => {
                        tracing::warn!(tx_hash = %submitted.hash, status = ?status, "Strike not confirmed");
                    }
                    Err(BlockchainError::Reverted(_)) => {
                        tracing::warn!(tx_hash = %submitted.hash, "Strike reverted on chain");
                    }
                    Err(e) => {
                        tracing::warn!(tx_hash = %submitted.hash, error = %e, "Stopped waiting for strike confirmation");
                    }
                }
            });
        }

        Ok(StrikeOutcome::Submitted(submitted))
    }

    /// Transfer native currency for an operator request.
    pub async fn withdraw(&self, request: &WithdrawRequest) -> BlockchainResult<SubmittedTx> {
        if request.amount == NativeAmount::ZERO {
            return Err(BlockchainError::InvalidAmount(
                "withdrawal amount must be positive".to_string(),
            ));
        }

        let destination = request
            .destination
            .or(self.withdraw.payout_address)
            .ok_or_else(|| {
                BlockchainError::Submission("no destination and no payout wallet configured".into())
            })?;

        tracing::info!(
            strategy = %request.strategy,
            amount = %request.amount,
            destination = %destination,
            "Withdrawal requested"
        );

        self.issue(TxIntent {
            origin: IntentOrigin::Operator,
            to: destination,
            value: request.amount.wei(),
            input: Bytes::new(),
            gas_limit: self.withdraw.gas_limit,
            fees: FeePolicy::identity(),
        })
        .await
    }

    /// Reserve a nonce, sign and broadcast `intent`.
    ///
    /// The fee estimate is taken before the reservation so an estimate
    /// failure does not burn a nonce. Once reserved, a nonce is consumed
    /// whatever the outcome.
    pub async fn issue(&self, intent: TxIntent) -> BlockchainResult<SubmittedTx> {
        let origin = intent.origin;
        let span = tracing::info_span!("issue", intent_id = %Uuid::new_v4(), origin = origin.as_str());

        let result = self.issue_inner(intent).instrument(span).await;
        metrics::record_submission(
            origin.as_str(),
            match &result {
                Ok(_) => "submitted",
                Err(BlockchainError::NonceConflict(_)) => "nonce_conflict",
                Err(_) => "failed",
            },
        );
        result
    }

    async fn issue_inner(&self, intent: TxIntent) -> BlockchainResult<SubmittedTx> {
        let estimate = self.provider.get_fee_estimate().await?;
        let fees = intent.fees.apply(&estimate);

        let reservation = self
            .account
            .nonce()
            .reserve(&self.provider, self.account.address())
            .await?;
        let nonce = reservation.nonce();

        let request = TransactionRequest::default()
            .transaction_type(EIP1559_TX_TYPE)
            .with_to(intent.to)
            .with_value(intent.value)
            .with_input(intent.input)
            .with_nonce(nonce)
            .with_gas_limit(intent.gas_limit)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas)
            .with_max_fee_per_gas(fees.max_fee_per_gas);

        let signed = self.wallet.sign(request).await?;

        match self.provider.send_raw_transaction(signed.raw).await {
            Ok(hash) => {
                tracing::info!(
                    tx_hash = %hash,
                    nonce,
                    to = %intent.to,
                    max_fee_per_gas = fees.max_fee_per_gas,
                    max_priority_fee_per_gas = fees.max_priority_fee_per_gas,
                    "Transaction submitted"
                );
                Ok(SubmittedTx {
                    hash,
                    nonce,
                    origin: intent.origin,
                })
            }
            Err(e) if e.is_nonce_conflict() => {
                // Resolved: this nonce no longer holds back the resync.
                drop(reservation);
                self.account.nonce().mark_stale().await;
                tracing::warn!(nonce, error = %e, "Nonce conflict, cursor will resync before next issuance");
                Err(BlockchainError::NonceConflict(e.to_string()))
            }
            Err(e) => {
                tracing::error!(nonce, error = %e, "Submission failed, nonce burned");
                Err(BlockchainError::Submission(e.to_string()))
            }
        }
    }
}

impl fmt::Debug for TxIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxIssuer")
            .field("address", &self.account.address())
            .field("next_nonce", &self.account.next_nonce())
            .finish_non_exhaustive()
    }
}

/// Poll for a receipt until `required` confirmations or `limit` elapses.
pub async fn wait_for_confirmation(
    provider: &FailoverProvider,
    tx_hash: TxHash,
    required: u32,
    limit: Duration,
) -> BlockchainResult<ConfirmationStatus> {
    let result = timeout(limit, async {
        let mut ticker = interval(CONFIRMATION_POLL_INTERVAL);

        loop {
            ticker.tick().await;

            let receipt = match provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(r)) => r,
                Ok(None) => {
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    continue;
                }
                Err(e) => {
                    tracing::debug!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed");
                    continue;
                }
            };

            if !receipt.success {
                return Err(BlockchainError::Reverted(tx_hash.to_string()));
            }

            let current_block = match provider.get_block_number().await {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(tx_hash = %tx_hash, error = %e, "Block number lookup failed");
                    continue;
                }
            };
            let tx_block = receipt.block_number.unwrap_or(current_block);
            // The inclusion block counts as the first confirmation.
            let confirmations =
                u32::try_from(current_block.saturating_sub(tx_block) + 1).unwrap_or(u32::MAX);

            if confirmations >= required {
                return Ok(ConfirmationStatus::Confirmed {
                    block_number: tx_block,
                });
            }

            tracing::debug!(
                tx_hash = %tx_hash,
                status = ?ConfirmationStatus::Confirming { current: confirmations, required },
                "Waiting for confirmations"
            );
        }
    })
    .await;

    match result {
        Ok(status) => status,
        Err(_) => Err(BlockchainError::ConfirmationTimeout(required)),
    }
}
