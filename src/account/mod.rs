//! Account State for the signing account.
//!
//! # Data Flow
//! ```text
//! Boot (balance + pending nonce)
//!     → AccountState::new
//!     → issuer reserves nonces, marks the cursor stale on conflicts
//!     → heartbeat / status refresh the cached balance and read the cursor
//! ```

pub mod state;

pub use state::{AccountState, NonceCursor};
