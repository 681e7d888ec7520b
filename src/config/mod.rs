//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML) + .env
//!     → loader.rs (parse, overlay + sanitize environment values)
//!     → validation.rs (semantic checks)
//!     → AgentConfig (validated, immutable)
//!     → shared via Arc in AgentContext
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at process start and never reloaded
//! - All fields have defaults to allow an env-only deployment
//! - The signing key never enters AgentConfig; the wallet reads it directly

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AgentConfig, BootConfig, EndpointConfig, EndpointPoolConfig, HeartbeatConfig, ListenerConfig,
    ObservabilityConfig, RetryPolicyConfig, RetryStrategy, StrikeConfig, WatcherConfig,
    WithdrawConfig,
};
