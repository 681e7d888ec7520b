//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, spans carrying intent ids)
//!     → metrics.rs (counters, gauges)
//!     → redact.rs (endpoint URLs reduced to scheme and host)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every issued intent carries a UUID span field for correlation
//! - Metrics are cheap and never fail the caller

pub mod logging;
pub mod metrics;
pub mod redact;

pub use logging::init_tracing;
pub use metrics::init_metrics;
pub use redact::{redact_url, scrub_url};
