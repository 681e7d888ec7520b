//! Ledger-facing types and error definitions.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const WEI_PER_NATIVE: u64 = 1_000_000_000_000_000_000;

/// An amount of the native currency, held as an exact integer in wei.
///
/// Parses from a decimal string in whole native units (`"0.05"`), so
/// monetary values never pass through a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NativeAmount(U256);

impl NativeAmount {
    pub const ZERO: Self = Self(U256::ZERO);

    pub fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    /// Whole native units, e.g. `from_whole(100)` is 100 ETH.
    pub fn from_whole(units: u64) -> Self {
        Self(U256::from(units) * U256::from(WEI_PER_NATIVE))
    }

    pub fn wei(&self) -> U256 {
        self.0
    }
}

impl FromStr for NativeAmount {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(BlockchainError::InvalidAmount("empty amount".to_string()));
        }
        if trimmed.starts_with(['-', '+']) || trimmed.contains(['e', 'E']) {
            return Err(BlockchainError::InvalidAmount(format!(
                "'{}' is not a plain non-negative decimal",
                trimmed
            )));
        }
        parse_ether(trimmed)
            .map(Self)
            .map_err(|e| BlockchainError::InvalidAmount(format!("'{}': {}", trimmed, e)))
    }
}

impl TryFrom<String> for NativeAmount {
    type Error = BlockchainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NativeAmount> for String {
    fn from(amount: NativeAmount) -> Self {
        amount.to_string()
    }
}

impl fmt::Display for NativeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_ether(self.0))
    }
}

/// A pending transaction seen in the mempool, as fetched by hash.
///
/// Ephemeral: produced by the watcher pipeline and consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCandidate {
    pub hash: TxHash,
    /// `None` for contract creations.
    pub recipient: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub gas_limit: u64,
}

/// Current EIP-1559 fee estimate as reported by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// The parts of a receipt the issuer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Fewer endpoints than the quorum answered within their liveness timeouts.
    #[error("Provider unavailable for {operation}: {responded} of {quorum} required endpoints responded")]
    ProviderUnavailable {
        operation: &'static str,
        responded: usize,
        quorum: usize,
    },

    /// A live endpoint answered with a JSON-RPC error.
    #[error("Rejected by {endpoint} (code {code}): {message}")]
    Rejected {
        endpoint: String,
        code: i64,
        message: String,
    },

    /// The reserved nonce had already been consumed on-chain.
    #[error("Nonce conflict: {0}")]
    NonceConflict(String),

    /// Any other submission-time failure.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Transaction was not confirmed within expected time.
    #[error("Transaction not confirmed after {0} blocks")]
    ConfirmationTimeout(u32),

    /// Transaction was reverted on-chain.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Transaction could not be assembled or signed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// A monetary value could not be represented exactly.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl BlockchainError {
    /// True when a rejection message points at an already-used sequence number.
    pub fn is_nonce_conflict(&self) -> bool {
        match self {
            BlockchainError::NonceConflict(_) => true,
            BlockchainError::Rejected { message, .. } => {
                message.to_ascii_lowercase().contains("nonce")
            }
            _ => false,
        }
    }
}

/// Result type for ledger operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Transaction has been mined but not enough confirmations.
    Confirming { current: u32, required: u32 },
    /// Transaction is confirmed with required block depth.
    Confirmed { block_number: u64 },
}
