//! Per-endpoint JSON-RPC client.
//!
//! `LedgerRpc` is the seam between the failover logic and the wire: the
//! production implementation talks HTTP JSON-RPC through alloy, tests plug
//! in scripted ledgers.

use std::sync::Arc;
use std::time::Duration;

use alloy::consensus::Transaction as _;
use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::Transaction;
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use thiserror::Error;

use crate::blockchain::{FeeEstimate, PendingCandidate, ReceiptSummary};
use crate::observability::{redact_url, scrub_url};

/// Failure of a single endpoint call.
#[derive(Debug, Clone, Error)]
pub enum EndpointError {
    /// Connection, HTTP or decoding failure; the endpoint may be down.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rejected { code: i64, message: String },

    /// No answer within the endpoint's liveness timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

pub type EndpointResult<T> = Result<T, EndpointError>;

/// The ledger JSON-RPC methods the agent relies on.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// `eth_blockNumber`
    async fn block_number(&self) -> EndpointResult<u64>;

    /// `eth_getBalance(address, "latest")`
    async fn balance(&self, address: Address) -> EndpointResult<U256>;

    /// `eth_getTransactionCount(address, "pending")`
    async fn pending_nonce(&self, address: Address) -> EndpointResult<u64>;

    /// EIP-1559 fee estimate (`eth_feeHistory` based).
    async fn fee_estimate(&self) -> EndpointResult<FeeEstimate>;

    /// `eth_getTransactionByHash`
    async fn transaction_by_hash(&self, hash: TxHash) -> EndpointResult<Option<PendingCandidate>>;

    /// `eth_getTransactionReceipt`
    async fn transaction_receipt(&self, hash: TxHash) -> EndpointResult<Option<ReceiptSummary>>;

    /// `eth_sendRawTransaction`
    async fn send_raw_transaction(&self, raw: Bytes) -> EndpointResult<TxHash>;
}

/// HTTP JSON-RPC endpoint backed by an alloy provider.
#[derive(Clone)]
pub struct HttpLedgerRpc {
    provider: Arc<dyn Provider + Send + Sync>,
    /// Configured URL, only used to scrub it out of error text.
    url: String,
}

impl HttpLedgerRpc {
    /// Build a client for `url`. No request is made until the first call.
    pub fn connect(url: &str) -> EndpointResult<Self> {
        let parsed: url::Url = url.parse().map_err(|e| {
            EndpointError::Transport(format!("Invalid RPC URL '{}': {}", redact_url(url), e))
        })?;
        let provider = ProviderBuilder::new().connect_http(parsed);
        Ok(Self {
            provider: Arc::new(provider),
            url: url.to_string(),
        })
    }

    fn map_transport(&self, err: TransportError) -> EndpointError {
        match err {
            RpcError::ErrorResp(payload) => EndpointError::Rejected {
                code: payload.code,
                message: payload.message.to_string(),
            },
            other => EndpointError::Transport(scrub_url(&other.to_string(), &self.url)),
        }
    }
}

impl std::fmt::Debug for HttpLedgerRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLedgerRpc")
            .field("url", &redact_url(&self.url))
            .finish_non_exhaustive()
    }
}

fn candidate_from_rpc(hash: TxHash, tx: &Transaction) -> PendingCandidate {
    PendingCandidate {
        hash,
        recipient: tx.to(),
        value: tx.value(),
        input: tx.input().clone(),
        gas_limit: tx.gas_limit(),
    }
}

#[async_trait]
impl LedgerRpc for HttpLedgerRpc {
    async fn block_number(&self) -> EndpointResult<u64> {
        self.provider.get_block_number().await.map_err(|e| self.map_transport(e))
    }

    async fn balance(&self, address: Address) -> EndpointResult<U256> {
        self.provider.get_balance(address).await.map_err(|e| self.map_transport(e))
    }

    async fn pending_nonce(&self, address: Address) -> EndpointResult<u64> {
        self.provider
            .get_transaction_count(address)
            .block_id(BlockId::pending())
            .await
            .map_err(|e| self.map_transport(e))
    }

    async fn fee_estimate(&self) -> EndpointResult<FeeEstimate> {
        let estimate = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| self.map_transport(e))?;
        Ok(FeeEstimate {
            max_fee_per_gas: estimate.max_fee_per_gas,
            max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
        })
    }

    async fn transaction_by_hash(&self, hash: TxHash) -> EndpointResult<Option<PendingCandidate>> {
        let tx = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .map_err(|e| self.map_transport(e))?;
        Ok(tx.map(|tx| candidate_from_rpc(hash, &tx)))
    }

    async fn transaction_receipt(&self, hash: TxHash) -> EndpointResult<Option<ReceiptSummary>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| self.map_transport(e))?;
        Ok(receipt.map(|r| ReceiptSummary {
            block_number: r.block_number,
            success: r.status(),
        }))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> EndpointResult<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| self.map_transport(e))?;
        Ok(*pending.tx_hash())
    }
}
