//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Boot (boot.rs):
//!     Provider → block height, balance, pending nonce → AccountState
//!     Any failure → log, wait policy delay, retry the whole sequence
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGINT/SIGTERM → broadcast → every task leaves its loop
//! ```
//!
//! # Design Decisions
//! - Boot never gives up; its only failure causes are transient
//! - Invalid configuration or key material is fatal before boot starts

pub mod boot;
pub mod shutdown;
pub mod signals;

pub use boot::{BootReport, BootSequencer};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
