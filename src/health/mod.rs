//! Endpoint health checking.
//!
//! # Data Flow
//! ```text
//! Passive (provider/failover.rs):
//!     Every call outcome → Endpoint::mark_success / mark_failure
//!
//! Active (active.rs):
//!     Periodic timer
//!     → Probe each endpoint (eth_blockNumber)
//!     → Same state transitions as passive observations
//! ```
//!
//! # Design Decisions
//! - State transitions require consecutive successes/failures (hysteresis)
//! - Degraded endpoints are never removed from the pool

pub mod active;

pub use active::HealthMonitor;
