//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define agent metrics (RPC outcomes, endpoint health, candidates, submissions)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `agent_rpc_calls_total` (counter): RPC calls by operation, outcome
//! - `agent_endpoint_health` (gauge): 1=healthy, 0=degraded, per endpoint
//! - `agent_candidates_total` (counter): watcher candidates by outcome
//! - `agent_queue_dropped_total` (counter): candidates dropped on overflow
//! - `agent_submissions_total` (counter): submissions by origin, outcome
//! - `agent_nonce_resyncs_total` (counter): nonce cursor resyncs
//! - `agent_next_nonce` (gauge): next nonce the cursor will hand out
//! - `agent_wallet_balance_native` (gauge): last sampled balance
//! - `agent_watcher_reconnects_total` (counter): subscription reconnects
//! - `agent_boot_attempts_total` (counter): boot attempts by outcome
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rpc_call(operation: &'static str, outcome: &'static str) {
    counter!("agent_rpc_calls_total", "operation" => operation, "outcome" => outcome).increment(1);
}

pub fn record_endpoint_health(endpoint: &str, healthy: bool) {
    gauge!("agent_endpoint_health", "endpoint" => endpoint.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_candidate(outcome: &'static str) {
    counter!("agent_candidates_total", "outcome" => outcome).increment(1);
}

pub fn record_queue_drop() {
    counter!("agent_queue_dropped_total").increment(1);
}

pub fn record_submission(origin: &'static str, outcome: &'static str) {
    counter!("agent_submissions_total", "origin" => origin, "outcome" => outcome).increment(1);
}

pub fn record_nonce_resync(next_nonce: u64) {
    counter!("agent_nonce_resyncs_total").increment(1);
    record_next_nonce(next_nonce);
}

pub fn record_next_nonce(next_nonce: u64) {
    gauge!("agent_next_nonce").set(next_nonce as f64);
}

pub fn record_wallet_balance(balance_native: f64) {
    gauge!("agent_wallet_balance_native").set(balance_native);
}

pub fn record_watcher_reconnect() {
    counter!("agent_watcher_reconnects_total").increment(1);
}

pub fn record_boot_attempt(outcome: &'static str) {
    counter!("agent_boot_attempts_total", "outcome" => outcome).increment(1);
}
