//! Ledger access over a pool of redundant JSON-RPC endpoints.
//!
//! # Data Flow
//! ```text
//! EndpointPoolConfig (url, priority, liveness timeout)
//!     → endpoint.rs (Endpoint + health state)
//!     → rpc.rs (LedgerRpc: one JSON-RPC client per endpoint)
//!     → failover.rs (priority order, timeouts, quorum, degradation)
//!     → callers: boot, issuer, watcher pipeline, heartbeat
//! ```
//!
//! # Design Decisions
//! - Quorum of one by default: liveness over cross-endpoint consistency
//! - Failing endpoints are degraded, never removed
//! - Health is advisory; updated by calls and probes without cross-call locking

pub mod endpoint;
pub mod failover;
pub mod rpc;

pub use endpoint::{Endpoint, HealthState};
pub use failover::FailoverProvider;
pub use rpc::{EndpointError, EndpointResult, HttpLedgerRpc, LedgerRpc};
