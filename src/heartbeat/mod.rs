//! Periodic status sampling, shared with the `/status` endpoint.

pub mod reporter;

pub use reporter::{StatusReporter, StatusSnapshot};
