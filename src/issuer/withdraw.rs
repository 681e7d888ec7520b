//! Operator withdrawal requests.
//!
//! Every strategy label routes to the same transfer; the label is carried
//! through for logging and the response body only.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use thiserror::Error;

use crate::blockchain::NativeAmount;

/// The labelled withdrawal routes exposed to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WithdrawStrategy {
    StandardEoa,
    CheckBefore,
    CheckAfter,
    TwoFactorAuth,
    ContractCall,
    TimedRelease,
    MicroSplit3,
    ConsolidateMulti,
    MaxPriority,
    LowBaseOnly,
    LedgerSync,
    TelegramNotify,
}

impl WithdrawStrategy {
    pub const ALL: [WithdrawStrategy; 12] = [
        WithdrawStrategy::StandardEoa,
        WithdrawStrategy::CheckBefore,
        WithdrawStrategy::CheckAfter,
        WithdrawStrategy::TwoFactorAuth,
        WithdrawStrategy::ContractCall,
        WithdrawStrategy::TimedRelease,
        WithdrawStrategy::MicroSplit3,
        WithdrawStrategy::ConsolidateMulti,
        WithdrawStrategy::MaxPriority,
        WithdrawStrategy::LowBaseOnly,
        WithdrawStrategy::LedgerSync,
        WithdrawStrategy::TelegramNotify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawStrategy::StandardEoa => "standard-eoa",
            WithdrawStrategy::CheckBefore => "check-before",
            WithdrawStrategy::CheckAfter => "check-after",
            WithdrawStrategy::TwoFactorAuth => "two-factor-auth",
            WithdrawStrategy::ContractCall => "contract-call",
            WithdrawStrategy::TimedRelease => "timed-release",
            WithdrawStrategy::MicroSplit3 => "micro-split-3",
            WithdrawStrategy::ConsolidateMulti => "consolidate-multi",
            WithdrawStrategy::MaxPriority => "max-priority",
            WithdrawStrategy::LowBaseOnly => "low-base-only",
            WithdrawStrategy::LedgerSync => "ledger-sync",
            WithdrawStrategy::TelegramNotify => "telegram-notify",
        }
    }
}

impl fmt::Display for WithdrawStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown withdrawal strategy '{0}'")]
pub struct UnknownStrategy(pub String);

impl FromStr for WithdrawStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// A validated withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawRequest {
    pub strategy: WithdrawStrategy,
    pub amount: NativeAmount,
    /// Falls back to the configured payout wallet when `None`.
    pub destination: Option<Address>,
}
