//! Transaction Issuer subsystem.
//!
//! # Data Flow
//! ```text
//! Trigger candidate ──→ guards (recipient, trigger value, balance floor)
//!                           │
//! Operator withdrawal ──────┤
//!                           ▼
//!                  fee estimate → fees.rs (multipliers)
//!                           → nonce reservation (account::NonceCursor)
//!                           → sign (blockchain::Wallet)
//!                           → broadcast (provider::FailoverProvider)
//!                           → SubmittedTx
//! ```
//!
//! # Design Decisions
//! - Both origins share one reservation path
//! - A reserved nonce is never rolled back
//! - Nonce conflicts mark the cursor stale; the next reservation resyncs

pub mod fees;
#[allow(clippy::module_inception)]
pub mod issuer;
pub mod withdraw;

pub use fees::{FeeParams, FeePolicy};
pub use issuer::{
    wait_for_confirmation, IntentOrigin, SkipReason, StrikeOutcome, SubmittedTx, TxIntent,
    TxIssuer,
};
pub use withdraw::{UnknownStrategy, WithdrawRequest, WithdrawStrategy};
