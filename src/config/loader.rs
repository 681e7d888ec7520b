//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::{AgentConfig, EndpointConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::observability::redact_url;

/// Primary JSON-RPC endpoint, tried before every other pool member.
pub const PRIMARY_RPC_ENV_VAR: &str = "QUICKNODE_HTTP";
/// Comma-separated backup endpoints; replaces the configured pool when set.
pub const BACKUP_RPCS_ENV_VAR: &str = "BACKUP_RPC_URLS";
/// Streaming endpoint for the mempool watcher.
pub const STREAM_URL_ENV_VAR: &str = "QUICKNODE_WSS";
pub const PAYOUT_WALLET_ENV_VAR: &str = "PAYOUT_WALLET";
pub const PORT_ENV_VAR: &str = "PORT";
/// Optional path to a TOML config file.
pub const CONFIG_PATH_ENV_VAR: &str = "AGENT_CONFIG";

const PRIMARY_PRIORITY: u32 = 1;
const BACKUP_PRIORITY: u32 = 2;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<AgentConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AgentConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Trim whitespace and strip quote characters from a raw environment value.
pub fn sanitize_value(raw: &str) -> String {
    raw.trim().replace(['\'', '"'], "").trim().to_string()
}

/// Sanitize an endpoint candidate, or `None` if it lacks an http(s) scheme.
pub fn sanitize_endpoint(raw: &str) -> Option<String> {
    let value = sanitize_value(raw);
    let has_scheme = value.starts_with("http://") || value.starts_with("https://");
    if has_scheme && url::Url::parse(&value).is_ok() {
        Some(value)
    } else {
        None
    }
}

/// Overlay environment values onto `config`.
///
/// `lookup` abstracts `std::env::var` so the overlay can be exercised in tests.
pub fn apply_env_overrides<F>(config: &mut AgentConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let timeout_ms = config
        .endpoints
        .pool
        .first()
        .map(|e| e.liveness_timeout_ms)
        .unwrap_or(3000);

    if let Some(raw) = lookup(BACKUP_RPCS_ENV_VAR) {
        config.endpoints.pool = raw
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|url| EndpointConfig {
                url: url.to_string(),
                priority: BACKUP_PRIORITY,
                liveness_timeout_ms: timeout_ms,
            })
            .collect();
    }

    if let Some(raw) = lookup(PRIMARY_RPC_ENV_VAR) {
        config.endpoints.pool.insert(
            0,
            EndpointConfig {
                url: raw,
                priority: PRIMARY_PRIORITY,
                liveness_timeout_ms: timeout_ms,
            },
        );
    }

    let mut pool: Vec<EndpointConfig> = Vec::with_capacity(config.endpoints.pool.len());
    for mut endpoint in std::mem::take(&mut config.endpoints.pool) {
        match sanitize_endpoint(&endpoint.url) {
            Some(url) if pool.iter().any(|e| e.url == url) => {
                tracing::debug!(url = %redact_url(&url), "Skipping duplicate endpoint");
            }
            Some(url) => {
                endpoint.url = url;
                pool.push(endpoint);
            }
            None => {
                tracing::warn!(url = %redact_url(&endpoint.url), "Dropping endpoint without http(s) scheme");
            }
        }
    }
    config.endpoints.pool = pool;

    if let Some(raw) = lookup(STREAM_URL_ENV_VAR) {
        let url = sanitize_value(&raw);
        if !url.is_empty() {
            config.watcher.ws_url = url;
        }
    }

    if let Some(raw) = lookup(PAYOUT_WALLET_ENV_VAR) {
        match sanitize_value(&raw).parse::<Address>() {
            Ok(address) => config.withdraw.payout_address = Some(address),
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid {}", PAYOUT_WALLET_ENV_VAR),
        }
    }

    if let Some(raw) = lookup(PORT_ENV_VAR) {
        match sanitize_value(&raw).parse::<u16>() {
            Ok(port) => {
                let host = config
                    .listener
                    .bind_address
                    .rsplit_once(':')
                    .map(|(host, _)| host.to_string())
                    .unwrap_or_else(|| "0.0.0.0".to_string());
                config.listener.bind_address = format!("{}:{}", host, port);
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid {}", PORT_ENV_VAR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_sanitize_endpoint() {
        assert_eq!(
            sanitize_endpoint("  \"https://base.example/rpc\"  ").as_deref(),
            Some("https://base.example/rpc")
        );
        assert_eq!(
            sanitize_endpoint(" https://mainnet.base.org ").as_deref(),
            Some("https://mainnet.base.org")
        );
        assert_eq!(sanitize_endpoint(" 'base.example/rpc' "), None);
        assert_eq!(sanitize_endpoint("wss://base.example"), None);
        assert_eq!(sanitize_endpoint(""), None);
    }

    #[test]
    fn test_primary_endpoint_is_prepended() {
        let vars = env(&[(PRIMARY_RPC_ENV_VAR, " 'https://primary.example' ")]);
        let mut config = AgentConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).cloned());

        assert_eq!(config.endpoints.pool.len(), 5);
        assert_eq!(config.endpoints.pool[0].url, "https://primary.example");
        assert_eq!(config.endpoints.pool[0].priority, 1);
        assert!(config.endpoints.pool[1..].iter().all(|e| e.priority == 2));
    }

    #[test]
    fn test_malformed_candidates_are_dropped() {
        let vars = env(&[
            (PRIMARY_RPC_ENV_VAR, "\"primary.example\""),
            (BACKUP_RPCS_ENV_VAR, "https://b1.example, ftp://b2.example,,https://b1.example"),
        ]);
        let mut config = AgentConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).cloned());

        let urls: Vec<_> = config.endpoints.pool.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b1.example"]);
    }

    #[test]
    fn test_scalar_overrides() {
        let vars = env(&[
            (PORT_ENV_VAR, "\"3000\""),
            (STREAM_URL_ENV_VAR, " 'wss://stream.example' "),
            (PAYOUT_WALLET_ENV_VAR, "0x1111111111111111111111111111111111111111"),
        ]);
        let mut config = AgentConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).cloned());

        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert_eq!(config.watcher.ws_url, "wss://stream.example");
        assert_eq!(config.withdraw.payout_address, Some(Address::repeat_byte(0x11)));
    }

    #[test]
    fn test_invalid_payout_is_ignored() {
        let vars = env(&[(PAYOUT_WALLET_ENV_VAR, "0xSET_YOUR_WALLET")]);
        let mut config = AgentConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).cloned());
        assert_eq!(config.withdraw.payout_address, None);
    }
}
