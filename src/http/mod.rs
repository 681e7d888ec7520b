//! Operator HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → handlers.rs
//!         POST /withdraw/{strategy} → issuer::TxIssuer::withdraw
//!         GET  /status              → heartbeat::StatusReporter::sample
//! ```
//!
//! Errors are always `{ "error": "..." }` JSON: 400 for malformed input,
//! 404 for unknown strategy labels, 500 for issuance failures.

pub mod handlers;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::HttpServer;
