//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key)
//!     → wallet.rs (key loading, signing)
//!     → contract.rs (strike calldata)
//!     → types.rs (amounts, candidates, fee estimates, errors)
//! ```
//!
//! Transport to the ledger lives in `provider`, sequencing in `issuer`.
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data

pub mod contract;
pub mod types;
pub mod wallet;

pub use types::{
    BlockchainError, BlockchainResult, ConfirmationStatus, FeeEstimate, NativeAmount,
    PendingCandidate, ReceiptSummary,
};
pub use wallet::{SignedTransaction, Wallet};
