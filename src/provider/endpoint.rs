//! A single pool member and its health.
//!
//! # Responsibilities
//! - Carry the static endpoint settings (url, priority, liveness timeout)
//! - Own the endpoint's RPC client
//! - Track health state (Unknown/Healthy/Degraded) with hysteresis

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::EndpointConfig;
use crate::observability::redact_url;
use crate::provider::rpc::LedgerRpc;

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Degraded = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Degraded,
            _ => HealthState::Unknown,
        }
    }
}

/// A single RPC endpoint in the failover pool.
///
/// Degraded endpoints stay in the pool and are retried on later calls.
pub struct Endpoint {
    /// The configured URL without credentials; the only form that is logged.
    label: String,
    priority: u32,
    liveness_timeout: Duration,
    rpc: Arc<dyn LedgerRpc>,

    /// Current health state (0=Unknown, 1=Healthy, 2=Degraded).
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
    /// Set once the endpoint has answered any call since process start.
    ever_responded: AtomicBool,
}

impl Endpoint {
    pub fn new(config: &EndpointConfig, rpc: Arc<dyn LedgerRpc>) -> Self {
        Self {
            label: redact_url(&config.url),
            priority: config.priority,
            liveness_timeout: Duration::from_millis(config.liveness_timeout_ms),
            rpc,
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            ever_responded: AtomicBool::new(false),
        }
    }

    /// Redacted URL for logs, metric labels and errors.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn liveness_timeout(&self) -> Duration {
        self.liveness_timeout
    }

    pub fn rpc(&self) -> Arc<dyn LedgerRpc> {
        self.rpc.clone()
    }

    pub fn health(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    pub fn is_degraded(&self) -> bool {
        self.health() == HealthState::Degraded
    }

    pub fn has_responded(&self) -> bool {
        self.ever_responded.load(Ordering::Relaxed)
    }

    /// Responded at least once and not currently degraded.
    pub fn is_active(&self) -> bool {
        self.has_responded() && !self.is_degraded()
    }

    /// Report a successful call or probe.
    ///
    /// Returns true if this report moved the endpoint into `Healthy`.
    pub fn mark_success(&self, recovery_threshold: u32) -> bool {
        self.ever_responded.store(true, Ordering::Relaxed);
        self.mark_alive(recovery_threshold)
    }

    /// Report that the endpoint is reachable but refused the call.
    ///
    /// Counts towards recovery, not towards `has_responded`.
    pub fn mark_alive(&self, recovery_threshold: u32) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        let current_state = self.health();
        if current_state == HealthState::Healthy {
            return false;
        }

        // An endpoint that has never failed becomes healthy on its first answer.
        let threshold = if current_state == HealthState::Unknown {
            1
        } else {
            recovery_threshold
        };
        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= threshold {
            self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
            self.consecutive_successes.store(0, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Report a failed call, timeout or probe.
    ///
    /// Returns true if this report moved the endpoint into `Degraded`.
    pub fn mark_failure(&self, degraded_threshold: u32) -> bool {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if self.is_degraded() {
            return false;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= degraded_threshold {
            self.state.store(HealthState::Degraded as u8, Ordering::Relaxed);
            self.consecutive_failures.store(0, Ordering::Relaxed);
            return true;
        }
        false
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.label)
            .field("priority", &self.priority)
            .field("liveness_timeout", &self.liveness_timeout)
            .field("health", &self.health())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::rpc::HttpLedgerRpc;

    fn endpoint() -> Endpoint {
        let config = EndpointConfig {
            url: "http://127.0.0.1:8545".into(),
            priority: 1,
            liveness_timeout_ms: 250,
        };
        let rpc = HttpLedgerRpc::connect(&config.url).unwrap();
        Endpoint::new(&config, Arc::new(rpc))
    }

    #[test]
    fn test_starts_unknown_and_inactive() {
        let ep = endpoint();
        assert_eq!(ep.health(), HealthState::Unknown);
        assert!(!ep.has_responded());
        assert!(!ep.is_active());
        assert_eq!(ep.liveness_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_hysteresis() {
        let ep = endpoint();
        assert!(ep.mark_success(2));
        assert_eq!(ep.health(), HealthState::Healthy);

        assert!(!ep.mark_failure(2));
        assert_eq!(ep.health(), HealthState::Healthy);
        assert!(ep.mark_failure(2));
        assert!(ep.is_degraded());
        assert!(ep.has_responded());
        assert!(!ep.is_active());

        assert!(!ep.mark_success(2));
        assert!(ep.is_degraded());
        assert!(ep.mark_success(2));
        assert!(ep.is_active());
    }

    #[test]
    fn test_refusals_do_not_count_as_answers() {
        let ep = endpoint();
        assert!(ep.mark_alive(1));
        assert_eq!(ep.health(), HealthState::Healthy);
        assert!(!ep.has_responded());
        assert!(!ep.is_active());
    }

    #[test]
    fn test_credentials_never_leave_the_endpoint() {
        let config = EndpointConfig {
            url: "https://node.example/0123456789abcdef".into(),
            priority: 1,
            liveness_timeout_ms: 250,
        };
        let rpc = HttpLedgerRpc::connect(&config.url).unwrap();
        let ep = Endpoint::new(&config, Arc::new(rpc));

        assert_eq!(ep.label(), "https://node.example/…");
        assert!(!format!("{:?}", ep).contains("0123456789abcdef"));
    }
}
