//! Retry delays: fixed, or exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

use crate::config::{RetryPolicyConfig, RetryStrategy};

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Delay policy for the unlimited retry loops (boot, watcher reconnect).
///
/// There is no attempt limit; the policy only decides how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Fixed(Duration),
    Exponential { base: Duration, max: Duration },
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        RetryPolicy::Fixed(delay)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            RetryPolicy::Fixed(delay) => delay,
            RetryPolicy::Exponential { base, max } => calculate_backoff(
                attempt.max(1),
                base.as_millis() as u64,
                max.as_millis() as u64,
            ),
        }
    }
}

impl From<&RetryPolicyConfig> for RetryPolicy {
    fn from(config: &RetryPolicyConfig) -> Self {
        match config.strategy {
            RetryStrategy::Fixed => RetryPolicy::Fixed(Duration::from_millis(config.delay_ms)),
            RetryStrategy::Exponential => RetryPolicy::Exponential {
                base: Duration::from_millis(config.delay_ms),
                max: Duration::from_millis(config.max_delay_ms),
            },
        }
    }
}
