//! Quorum-based failover across the endpoint pool.
//!
//! # Responsibilities
//! - Order endpoints by priority, degraded ones last within a priority
//! - Apply each endpoint's liveness timeout
//! - Return the highest-priority answer once `quorum` endpoints answered
//! - Mark endpoints degraded/healthy from call outcomes
//!
//! Reads are eventually consistent: endpoints may briefly disagree on head
//! state and no agreement check is made between answers.

use std::future::Future;
use std::sync::Arc;

use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use tokio::time::timeout;

use crate::blockchain::{
    BlockchainError, BlockchainResult, FeeEstimate, PendingCandidate, ReceiptSummary,
};
use crate::config::EndpointPoolConfig;
use crate::observability::{metrics, redact_url};
use crate::provider::endpoint::Endpoint;
use crate::provider::rpc::{EndpointError, EndpointResult, HttpLedgerRpc, LedgerRpc};

const SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";

/// Ledger client multiplexed over a pool of redundant endpoints.
pub struct FailoverProvider {
    endpoints: Vec<Arc<Endpoint>>,
    quorum: usize,
    degraded_threshold: u32,
    recovery_threshold: u32,
}

impl FailoverProvider {
    /// Create a provider over already-built endpoints.
    ///
    /// `quorum` is clamped to at least 1.
    pub fn new(endpoints: Vec<Arc<Endpoint>>, quorum: usize) -> Self {
        Self {
            endpoints,
            quorum: quorum.max(1),
            degraded_threshold: 1,
            recovery_threshold: 1,
        }
    }

    pub fn with_thresholds(mut self, degraded_threshold: u32, recovery_threshold: u32) -> Self {
        self.degraded_threshold = degraded_threshold.max(1);
        self.recovery_threshold = recovery_threshold.max(1);
        self
    }

    /// Build HTTP endpoints for every configured pool member.
    pub fn from_config(config: &EndpointPoolConfig) -> Self {
        let mut endpoints = Vec::with_capacity(config.pool.len());
        for endpoint_config in &config.pool {
            match HttpLedgerRpc::connect(&endpoint_config.url) {
                Ok(rpc) => {
                    endpoints.push(Arc::new(Endpoint::new(endpoint_config, Arc::new(rpc))));
                }
                Err(e) => {
                    tracing::warn!(url = %redact_url(&endpoint_config.url), error = %e, "Ignoring invalid RPC URL");
                }
            }
        }

        tracing::info!(
            pool_size = endpoints.len(),
            quorum = config.quorum,
            "Failover provider initialized"
        );

        Self::new(endpoints, config.quorum)
            .with_thresholds(config.degraded_threshold, config.recovery_threshold)
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn pool_size(&self) -> usize {
        self.endpoints.len()
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// True once at least `quorum` endpoints have answered since start.
    pub fn is_usable(&self) -> bool {
        self.endpoints.iter().filter(|e| e.has_responded()).count() >= self.quorum
    }

    /// Endpoints that have answered and are not currently degraded.
    pub fn active_endpoints(&self) -> usize {
        self.endpoints.iter().filter(|e| e.is_active()).count()
    }

    /// Record the outcome of a call or probe against `endpoint`.
    pub fn record_outcome(&self, endpoint: &Endpoint, healthy: bool) {
        if healthy {
            if endpoint.mark_success(self.recovery_threshold) {
                tracing::info!(endpoint = %endpoint.label(), "Endpoint healthy");
            }
        } else if endpoint.mark_failure(self.degraded_threshold) {
            tracing::warn!(endpoint = %endpoint.label(), "Endpoint degraded");
        }
        metrics::record_endpoint_health(endpoint.label(), !endpoint.is_degraded());
    }

    /// A JSON-RPC error: the endpoint is alive but did not answer the call.
    fn record_refusal(&self, endpoint: &Endpoint) {
        if endpoint.mark_alive(self.recovery_threshold) {
            tracing::info!(endpoint = %endpoint.label(), "Endpoint healthy");
        }
        metrics::record_endpoint_health(endpoint.label(), !endpoint.is_degraded());
    }

    /// Endpoints in call order: priority ascending, degraded last within a priority.
    fn call_order(&self) -> Vec<Arc<Endpoint>> {
        let mut ordered = self.endpoints.clone();
        ordered.sort_by_key(|e| (e.priority(), e.is_degraded()));
        ordered
    }

    /// Run a read against the pool until `quorum` endpoints answered.
    async fn read<T, F, Fut>(&self, operation: &'static str, call: F) -> BlockchainResult<T>
    where
        F: Fn(Arc<dyn LedgerRpc>) -> Fut,
        Fut: Future<Output = EndpointResult<T>>,
    {
        let mut answer: Option<T> = None;
        let mut responded = 0usize;

        for endpoint in self.call_order() {
            match timeout(endpoint.liveness_timeout(), call(endpoint.rpc())).await {
                Ok(Ok(value)) => {
                    self.record_outcome(&endpoint, true);
                    metrics::record_rpc_call(operation, "ok");
                    responded += 1;
                    if answer.is_none() {
                        answer = Some(value);
                    }
                    if responded >= self.quorum {
                        break;
                    }
                }
                Ok(Err(EndpointError::Rejected { code, message })) => {
                    // Alive, but refused this call; it does not count towards quorum.
                    self.record_refusal(&endpoint);
                    metrics::record_rpc_call(operation, "rejected");
                    tracing::warn!(
                        endpoint = %endpoint.label(),
                        operation,
                        code,
                        message = %message,
                        "RPC error, trying next endpoint"
                    );
                }
                Ok(Err(e)) => {
                    self.record_outcome(&endpoint, false);
                    metrics::record_rpc_call(operation, "error");
                    tracing::warn!(endpoint = %endpoint.label(), operation, error = %e, "RPC error, trying next endpoint");
                }
                Err(_) => {
                    self.record_outcome(&endpoint, false);
                    metrics::record_rpc_call(operation, "timeout");
                    tracing::warn!(
                        endpoint = %endpoint.label(),
                        operation,
                        timeout = ?endpoint.liveness_timeout(),
                        "RPC timeout, trying next endpoint"
                    );
                }
            }
        }

        match answer {
            Some(value) if responded >= self.quorum => Ok(value),
            _ => Err(BlockchainError::ProviderUnavailable {
                operation,
                responded,
                quorum: self.quorum,
            }),
        }
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.read("eth_blockNumber", |rpc| async move { rpc.block_number().await })
            .await
    }

    /// Get the balance of an address.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.read("eth_getBalance", move |rpc| async move { rpc.balance(address).await })
            .await
    }

    /// Get the pending transaction count (next nonce) for an address.
    pub async fn get_pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.read("eth_getTransactionCount", move |rpc| async move {
            rpc.pending_nonce(address).await
        })
        .await
    }

    /// Get the current EIP-1559 fee estimate.
    pub async fn get_fee_estimate(&self) -> BlockchainResult<FeeEstimate> {
        self.read("eth_feeHistory", |rpc| async move { rpc.fee_estimate().await })
            .await
    }

    /// Get a transaction by hash; `None` if no endpoint in the quorum knows it.
    pub async fn get_transaction(&self, hash: TxHash) -> BlockchainResult<Option<PendingCandidate>> {
        self.read("eth_getTransactionByHash", move |rpc| async move {
            rpc.transaction_by_hash(hash).await
        })
        .await
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        hash: TxHash,
    ) -> BlockchainResult<Option<ReceiptSummary>> {
        self.read("eth_getTransactionReceipt", move |rpc| async move {
            rpc.transaction_receipt(hash).await
        })
        .await
    }

    /// Broadcast a signed transaction.
    ///
    /// The first acceptance wins. A JSON-RPC error from a live endpoint is
    /// authoritative and returned as `Rejected`; transport failures and
    /// timeouts fall through to the next endpoint.
    pub async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        for endpoint in self.call_order() {
            let rpc = endpoint.rpc();
            let call = rpc.send_raw_transaction(raw.clone());
            match timeout(endpoint.liveness_timeout(), call).await {
                Ok(Ok(hash)) => {
                    self.record_outcome(&endpoint, true);
                    metrics::record_rpc_call(SEND_RAW_TRANSACTION, "ok");
                    return Ok(hash);
                }
                Ok(Err(EndpointError::Rejected { code, message })) => {
                    if is_already_known(&message) {
                        self.record_outcome(&endpoint, true);
                        // An earlier attempt reached the mempool before timing out.
                        metrics::record_rpc_call(SEND_RAW_TRANSACTION, "ok");
                        return Ok(keccak256(&raw));
                    }
                    self.record_refusal(&endpoint);
                    metrics::record_rpc_call(SEND_RAW_TRANSACTION, "rejected");
                    return Err(BlockchainError::Rejected {
                        endpoint: endpoint.label().to_string(),
                        code,
                        message,
                    });
                }
                Ok(Err(e)) => {
                    self.record_outcome(&endpoint, false);
                    metrics::record_rpc_call(SEND_RAW_TRANSACTION, "error");
                    tracing::warn!(endpoint = %endpoint.label(), error = %e, "Broadcast failed, trying next endpoint");
                }
                Err(_) => {
                    self.record_outcome(&endpoint, false);
                    metrics::record_rpc_call(SEND_RAW_TRANSACTION, "timeout");
                    tracing::warn!(endpoint = %endpoint.label(), "Broadcast timeout, trying next endpoint");
                }
            }
        }

        Err(BlockchainError::ProviderUnavailable {
            operation: SEND_RAW_TRANSACTION,
            responded: 0,
            quorum: 1,
        })
    }
}

fn is_already_known(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("already known") || message.contains("known transaction")
}

impl std::fmt::Debug for FailoverProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverProvider")
            .field("pool_size", &self.endpoints.len())
            .field("quorum", &self.quorum)
            .field("active", &self.active_endpoints())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;

    fn config(urls: &[&str]) -> EndpointPoolConfig {
        EndpointPoolConfig {
            pool: urls
                .iter()
                .map(|url| EndpointConfig {
                    url: url.to_string(),
                    priority: 2,
                    liveness_timeout_ms: 200,
                })
                .collect(),
            ..EndpointPoolConfig::default()
        }
    }

    #[test]
    fn test_from_config_skips_invalid_urls() {
        let provider = FailoverProvider::from_config(&config(&["http://127.0.0.1:1", "::bad::"]));
        assert_eq!(provider.pool_size(), 1);
        assert_eq!(provider.quorum(), 1);
        assert!(!provider.is_usable());
    }

    #[tokio::test]
    async fn test_all_endpoints_down() {
        let provider = FailoverProvider::from_config(&config(&[
            "http://127.0.0.1:1",
            "http://127.0.0.1:2",
        ]));

        let err = provider.get_block_number().await.unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::ProviderUnavailable { responded: 0, quorum: 1, .. }
        ));
        assert!(provider.endpoints().iter().all(|e| e.is_degraded()));
        // Degraded endpoints are kept for the next call.
        assert_eq!(provider.pool_size(), 2);
    }

    #[test]
    fn test_already_known_detection() {
        assert!(is_already_known("already known"));
        assert!(is_already_known("ALREADY_EXISTS: known transaction: 0xabc"));
        assert!(!is_already_known("nonce too low"));
    }
}
