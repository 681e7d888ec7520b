//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files;
//! environment overrides are applied afterwards by `loader`.

use alloy::primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};

use crate::blockchain::NativeAmount;

/// Root configuration for the agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Operator HTTP listener.
    pub listener: ListenerConfig,

    /// Chain parameters.
    pub chain: ChainConfig,

    /// RPC endpoint pool and failover behaviour.
    pub endpoints: EndpointPoolConfig,

    /// Pending-transaction subscription.
    pub watcher: WatcherConfig,

    /// Trigger-originated transaction parameters.
    pub strike: StrikeConfig,

    /// Operator withdrawal parameters.
    pub withdraw: WithdrawConfig,

    /// Boot sequence retry behaviour.
    pub boot: BootConfig,

    /// Heartbeat sampling.
    pub heartbeat: HeartbeatConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Chain ID (8453 for Base mainnet, 31337 for local Anvil).
    pub chain_id: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { chain_id: 8453 }
    }
}

/// A single RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// JSON-RPC URL (http or https).
    pub url: String,

    /// Lower values are tried first.
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// How long to wait for this endpoint before moving on.
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,
}

fn default_priority() -> u32 {
    2
}

fn default_liveness_timeout_ms() -> u64 {
    3000
}

/// Endpoint pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointPoolConfig {
    /// Candidate endpoints. Env overrides prepend the primary endpoint.
    pub pool: Vec<EndpointConfig>,

    /// Number of endpoints that must answer for a read to succeed.
    pub quorum: usize,

    /// Active probe interval in seconds (0 disables probing).
    pub probe_interval_secs: u64,

    /// Consecutive failures before an endpoint is considered degraded.
    pub degraded_threshold: u32,

    /// Consecutive successes before a degraded endpoint is healthy again.
    pub recovery_threshold: u32,
}

impl Default for EndpointPoolConfig {
    fn default() -> Self {
        let pool = [
            "https://mainnet.base.org",
            "https://base.llamarpc.com",
            "https://base.drpc.org",
            "https://1rpc.io/base",
        ]
        .into_iter()
        .map(|url| EndpointConfig {
            url: url.to_string(),
            priority: default_priority(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
        })
        .collect();

        Self {
            pool,
            quorum: 1,
            probe_interval_secs: 15,
            degraded_threshold: 1,
            recovery_threshold: 1,
        }
    }
}

/// Retry delay strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    Fixed,
    Exponential,
}

/// Unlimited-retry delay policy shared by boot and reconnect loops.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    pub strategy: RetryStrategy,

    /// Fixed delay, or base delay for exponential backoff, in milliseconds.
    pub delay_ms: u64,

    /// Cap for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Fixed,
            delay_ms: 5000,
            max_delay_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Enable the mempool watcher.
    pub enabled: bool,

    /// Streaming endpoint (ws or wss).
    pub ws_url: String,

    /// Delay policy between reconnect attempts.
    pub reconnect: RetryPolicyConfig,

    /// Bounded candidate queue; the oldest hash is dropped on overflow.
    pub queue_capacity: usize,

    /// Maximum concurrent detail fetches.
    pub max_inflight_fetches: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ws_url: "wss://base-rpc.publicnode.com".to_string(),
            reconnect: RetryPolicyConfig::default(),
            queue_capacity: 1024,
            max_inflight_fetches: 64,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StrikeConfig {
    /// Contract whose `executeFlashArbitrage` is invoked.
    pub contract_address: Address,

    pub token_in: Address,

    pub token_out: Address,

    /// `amount` argument of the contract call, in native units.
    pub amount: NativeAmount,

    pub gas_limit: u64,

    /// Multiplier applied to the estimated priority fee.
    pub priority_fee_multiplier: u64,

    /// Multiplier applied to the estimated max fee.
    pub max_fee_multiplier: u64,

    /// Candidates below this value are ignored.
    pub min_trigger_value: NativeAmount,

    /// No strikes while the cached balance is below this floor.
    pub min_balance: NativeAmount,

    /// Confirmations awaited in the background after a strike (0 = don't wait).
    pub confirmations: u32,

    pub confirmation_timeout_secs: u64,
}

impl Default for StrikeConfig {
    fn default() -> Self {
        Self {
            contract_address: address!("83EF5c401fAa5B9674BAfAcFb089b30bAc67C9A0"),
            token_in: address!("4200000000000000000000000000000000000006"),
            token_out: address!("4edbc9ba171790664872997239bc7a3f3a633190"),
            amount: NativeAmount::from_whole(100),
            gas_limit: 850_000,
            priority_fee_multiplier: 3,
            max_fee_multiplier: 2,
            min_trigger_value: NativeAmount::from_wei(U256::from(50_000_000_000_000_000u64)),
            min_balance: NativeAmount::from_wei(U256::from(1_500_000_000_000_000u64)),
            confirmations: 1,
            confirmation_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WithdrawConfig {
    /// Default destination when a request names none.
    pub payout_address: Option<Address>,

    pub gas_limit: u64,
}

impl Default for WithdrawConfig {
    fn default() -> Self {
        Self {
            payout_address: None,
            gas_limit: 21_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BootConfig {
    pub retry: RetryPolicyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "mempool_agent=info,tower_http=info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
