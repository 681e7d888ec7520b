//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Every failing rule is
//! reported, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{AgentConfig, RetryPolicyConfig};
use crate::observability::redact_url;

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a fully loaded configuration.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let pool_size = config.endpoints.pool.len();
    if pool_size == 0 {
        errors.push(ValidationError::new(
            "endpoints.pool",
            "no usable http(s) endpoint configured",
        ));
    }
    if config.endpoints.quorum == 0 || config.endpoints.quorum > pool_size {
        errors.push(ValidationError::new(
            "endpoints.quorum",
            format!("must be between 1 and the pool size ({})", pool_size),
        ));
    }
    if config.endpoints.pool.iter().any(|e| e.liveness_timeout_ms == 0) {
        errors.push(ValidationError::new(
            "endpoints.pool.liveness_timeout_ms",
            "must be greater than zero",
        ));
    }
    if config.endpoints.degraded_threshold == 0 || config.endpoints.recovery_threshold == 0 {
        errors.push(ValidationError::new(
            "endpoints.degraded_threshold",
            "health thresholds must be at least 1",
        ));
    }

    if config.watcher.enabled {
        let ws = &config.watcher.ws_url;
        if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
            errors.push(ValidationError::new(
                "watcher.ws_url",
                format!("'{}' is not a ws:// or wss:// URL", redact_url(ws)),
            ));
        }
    }
    if config.watcher.queue_capacity == 0 {
        errors.push(ValidationError::new("watcher.queue_capacity", "must be at least 1"));
    }
    if config.watcher.max_inflight_fetches == 0 {
        errors.push(ValidationError::new(
            "watcher.max_inflight_fetches",
            "must be at least 1",
        ));
    }
    check_retry("watcher.reconnect", &config.watcher.reconnect, &mut errors);
    check_retry("boot.retry", &config.boot.retry, &mut errors);

    if config.strike.priority_fee_multiplier == 0 || config.strike.max_fee_multiplier == 0 {
        errors.push(ValidationError::new(
            "strike.fee_multipliers",
            "multipliers must be at least 1",
        ));
    }
    if config.strike.gas_limit == 0 || config.withdraw.gas_limit == 0 {
        errors.push(ValidationError::new("gas_limit", "must be greater than zero"));
    }

    if config.withdraw.payout_address.is_none() {
        errors.push(ValidationError::new(
            "withdraw.payout_address",
            "set PAYOUT_WALLET or withdraw.payout_address",
        ));
    }

    if config.heartbeat.interval_secs == 0 {
        errors.push(ValidationError::new("heartbeat.interval_secs", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_retry(field: &'static str, retry: &RetryPolicyConfig, errors: &mut Vec<ValidationError>) {
    if retry.delay_ms == 0 {
        errors.push(ValidationError::new(field, "delay_ms must be greater than zero"));
    }
    if retry.max_delay_ms < retry.delay_ms {
        errors.push(ValidationError::new(field, "max_delay_ms must be >= delay_ms"));
    }
}
