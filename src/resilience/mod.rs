//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failed boot attempt / closed subscription
//!     → backoff.rs (RetryPolicy::delay_for(attempt))
//!     → sleep, then retry the whole sequence
//! ```
//!
//! # Design Decisions
//! - Boot and reconnect loops retry forever; the policy only shapes the delay
//! - Per-endpoint timeouts live with the endpoint (see `provider`)
//! - Jittered exponential backoff available to avoid synchronized reconnects

pub mod backoff;

pub use backoff::{calculate_backoff, RetryPolicy};
