//! Mempool Watcher subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket stream (eth_subscribe newPendingTransactions)
//!     → subscription.rs (state machine, reconnect policy)
//!     → queue.rs (bounded, drop-oldest)
//!     → pipeline.rs (fetch detail via FailoverProvider, bounded concurrency)
//!     → trigger.rs (predicate)
//!     → issuer::TxIssuer::strike
//! ```
//!
//! # Design Decisions
//! - The stream task never blocks on slow fetches; overflow drops the oldest hash
//! - Fetch failures are logged and counted, never propagated
//! - Reconnects are unlimited; only the delay is configurable

pub mod pipeline;
pub mod queue;
pub mod subscription;
pub mod trigger;

pub use pipeline::{process_candidate, CandidatePipeline};
pub use queue::CandidateQueue;
pub use subscription::{MempoolWatcher, WatcherError, WatcherState};
pub use trigger::{HasRecipient, TriggerPredicate};
