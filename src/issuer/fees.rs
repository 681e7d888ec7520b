//! EIP-1559 fee parameters derived from the network estimate.

use crate::blockchain::FeeEstimate;
use crate::config::StrikeConfig;

/// Integer multipliers applied to a fee estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub priority_multiplier: u64,
    pub max_multiplier: u64,
}

/// The fee fields of an outbound type-2 transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParams {
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
}

impl FeePolicy {
    /// Pay exactly the estimate.
    pub const fn identity() -> Self {
        Self {
            priority_multiplier: 1,
            max_multiplier: 1,
        }
    }

    pub fn from_strike(config: &StrikeConfig) -> Self {
        Self {
            priority_multiplier: config.priority_fee_multiplier,
            max_multiplier: config.max_fee_multiplier,
        }
    }

    /// Scale the estimate. Pure: same inputs, same output; saturates instead of wrapping.
    pub fn apply(&self, estimate: &FeeEstimate) -> FeeParams {
        let priority = estimate
            .max_priority_fee_per_gas
            .saturating_mul(u128::from(self.priority_multiplier));
        let max = estimate
            .max_fee_per_gas
            .saturating_mul(u128::from(self.max_multiplier));

        FeeParams {
            max_priority_fee_per_gas: priority,
            max_fee_per_gas: max,
        }
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strike_multipliers() {
        let policy = FeePolicy::from_strike(&StrikeConfig::default());
        let estimate = FeeEstimate {
            max_fee_per_gas: 40_000_000,
            max_priority_fee_per_gas: 1_000_000,
        };

        let params = policy.apply(&estimate);
        assert_eq!(params.max_priority_fee_per_gas, 3_000_000);
        assert_eq!(params.max_fee_per_gas, 80_000_000);
        assert_eq!(policy.apply(&estimate), params);
    }

    #[test]
    fn test_identity() {
        let estimate = FeeEstimate {
            max_fee_per_gas: 7,
            max_priority_fee_per_gas: 2,
        };
        let params = FeePolicy::identity().apply(&estimate);
        assert_eq!(params.max_fee_per_gas, 7);
        assert_eq!(params.max_priority_fee_per_gas, 2);
    }

    #[test]
    fn test_saturates() {
        let policy = FeePolicy {
            priority_multiplier: 3,
            max_multiplier: 2,
        };
        let estimate = FeeEstimate {
            max_fee_per_gas: u128::MAX,
            max_priority_fee_per_gas: u128::MAX / 2,
        };
        let params = policy.apply(&estimate);
        assert_eq!(params.max_fee_per_gas, u128::MAX);
        assert_eq!(params.max_priority_fee_per_gas, u128::MAX);
    }
}
