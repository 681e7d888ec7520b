//! Mempool strike agent library.

pub mod account;
pub mod blockchain;
pub mod config;
pub mod context;
pub mod health;
pub mod heartbeat;
pub mod http;
pub mod issuer;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod resilience;
pub mod watcher;

pub use config::schema::AgentConfig;
pub use context::AgentContext;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
