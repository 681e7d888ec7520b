//! Shared utilities for integration tests: a scriptable in-memory ledger and
//! a local pending-transaction WebSocket stream.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alloy::consensus::{Transaction as _, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use mempool_agent::account::AccountState;
use mempool_agent::blockchain::{FeeEstimate, PendingCandidate, ReceiptSummary, Wallet};
use mempool_agent::config::{AgentConfig, EndpointConfig};
use mempool_agent::provider::{Endpoint, EndpointError, EndpointResult, FailoverProvider, LedgerRpc};

/// Anvil's first development key.
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn test_wallet() -> Wallet {
    Wallet::from_private_key(TEST_PRIVATE_KEY, 8453).unwrap()
}

/// An in-memory ledger endpoint with injectable failures.
///
/// Submitted transactions are decoded and checked the way a node would:
/// a nonce below the confirmed floor or already in the pool is rejected
/// with "nonce too low".
pub struct MockLedger {
    block: AtomicU64,
    balance: Mutex<U256>,
    fee: FeeEstimate,
    /// Nonces below this are considered mined by someone else.
    nonce_floor: AtomicU64,
    used_nonces: Mutex<HashSet<u64>>,
    sent: Mutex<Vec<TxEnvelope>>,
    transactions: Mutex<HashMap<TxHash, PendingCandidate>>,
    down: AtomicBool,
    fail_next: AtomicU32,
    fail_block_number_next: AtomicU32,
    delay_ms: AtomicU64,
    send_delays: Mutex<HashMap<u64, Duration>>,
    reject_sends_with: Mutex<Option<String>>,
    calls: AtomicU32,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            block: AtomicU64::new(1_000),
            balance: Mutex::new(U256::from(10u64).pow(U256::from(18u64))),
            fee: FeeEstimate {
                max_fee_per_gas: 2_000_000_000,
                max_priority_fee_per_gas: 1_000_000,
            },
            nonce_floor: AtomicU64::new(0),
            used_nonces: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
            transactions: Mutex::new(HashMap::new()),
            down: AtomicBool::new(false),
            fail_next: AtomicU32::new(0),
            fail_block_number_next: AtomicU32::new(0),
            delay_ms: AtomicU64::new(0),
            send_delays: Mutex::new(HashMap::new()),
            reject_sends_with: Mutex::new(None),
            calls: AtomicU32::new(0),
        })
    }

    /// Every call fails with a transport error while down.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// The next `n` calls fail with a transport error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// The next `n` block number reads fail; other calls are unaffected.
    pub fn fail_block_number_next(&self, n: u32) {
        self.fail_block_number_next.store(n, Ordering::SeqCst);
    }

    /// Answer every call after `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Hold the broadcast of `nonce` for `delay` before judging it.
    pub fn delay_send_of(&self, nonce: u64, delay: Duration) {
        self.send_delays.lock().unwrap().insert(nonce, delay);
    }

    /// Reject every broadcast with this JSON-RPC error message.
    pub fn reject_sends_with(&self, message: Option<&str>) {
        *self.reject_sends_with.lock().unwrap() = message.map(str::to_string);
    }

    pub fn set_balance(&self, wei: U256) {
        *self.balance.lock().unwrap() = wei;
    }

    /// Simulate another process consuming nonces up to `floor`.
    pub fn set_nonce_floor(&self, floor: u64) {
        self.nonce_floor.store(floor, Ordering::SeqCst);
    }

    pub fn add_transaction(&self, candidate: PendingCandidate) {
        self.transactions
            .lock()
            .unwrap()
            .insert(candidate.hash, candidate);
    }

    pub fn sent(&self) -> Vec<TxEnvelope> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_nonces(&self) -> Vec<u64> {
        self.sent().iter().map(|tx| tx.nonce()).collect()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn pending_count(&self) -> u64 {
        let floor = self.nonce_floor.load(Ordering::SeqCst);
        let used = self.used_nonces.lock().unwrap();
        used.iter().map(|n| n + 1).max().unwrap_or(0).max(floor)
    }

    async fn enter(&self) -> EndpointResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.down.load(Ordering::SeqCst) {
            return Err(EndpointError::Transport("mock endpoint down".into()));
        }
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(EndpointError::Transport("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn block_number(&self) -> EndpointResult<u64> {
        self.enter().await?;
        let injected = self
            .fail_block_number_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(EndpointError::Transport("block number unavailable".into()));
        }
        Ok(self.block.fetch_add(1, Ordering::SeqCst))
    }

    async fn balance(&self, _address: Address) -> EndpointResult<U256> {
        self.enter().await?;
        Ok(*self.balance.lock().unwrap())
    }

    async fn pending_nonce(&self, _address: Address) -> EndpointResult<u64> {
        self.enter().await?;
        Ok(self.pending_count())
    }

    async fn fee_estimate(&self) -> EndpointResult<FeeEstimate> {
        self.enter().await?;
        Ok(self.fee)
    }

    async fn transaction_by_hash(&self, hash: TxHash) -> EndpointResult<Option<PendingCandidate>> {
        self.enter().await?;
        Ok(self.transactions.lock().unwrap().get(&hash).cloned())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> EndpointResult<Option<ReceiptSummary>> {
        self.enter().await?;
        let mined = self.sent().iter().any(|tx| *tx.tx_hash() == hash);
        Ok(mined.then(|| ReceiptSummary {
            block_number: Some(self.block.load(Ordering::SeqCst)),
            success: true,
        }))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> EndpointResult<TxHash> {
        self.enter().await?;

        if let Some(message) = self.reject_sends_with.lock().unwrap().clone() {
            return Err(EndpointError::Rejected {
                code: -32000,
                message,
            });
        }

        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| EndpointError::Rejected {
                code: -32602,
                message: format!("invalid raw transaction: {}", e),
            })?;

        let nonce = envelope.nonce();
        let held = self.send_delays.lock().unwrap().get(&nonce).copied();
        if let Some(delay) = held {
            tokio::time::sleep(delay).await;
        }
        {
            let mut used = self.used_nonces.lock().unwrap();
            if nonce < self.nonce_floor.load(Ordering::SeqCst) || used.contains(&nonce) {
                return Err(EndpointError::Rejected {
                    code: -32000,
                    message: "nonce too low".into(),
                });
            }
            used.insert(nonce);
        }

        let hash = *envelope.tx_hash();
        self.sent.lock().unwrap().push(envelope);
        Ok(hash)
    }
}

/// Build a pool endpoint backed by `ledger`.
pub fn mock_endpoint(ledger: &Arc<MockLedger>, name: &str, priority: u32, timeout_ms: u64) -> Arc<Endpoint> {
    let config = EndpointConfig {
        url: format!("http://{}.mock", name),
        priority,
        liveness_timeout_ms: timeout_ms,
    };
    Arc::new(Endpoint::new(&config, ledger.clone() as Arc<dyn LedgerRpc>))
}

/// Provider over one healthy mock ledger at priority 1.
pub fn single_ledger_provider(ledger: &Arc<MockLedger>) -> Arc<FailoverProvider> {
    Arc::new(FailoverProvider::new(
        vec![mock_endpoint(ledger, "primary", 1, 500)],
        1,
    ))
}

/// Account state seeded from the ledger's current view.
pub fn account_for(wallet: &Wallet, ledger: &MockLedger) -> Arc<AccountState> {
    Arc::new(AccountState::new(
        wallet.address(),
        *ledger.balance.lock().unwrap(),
        ledger.pending_count(),
    ))
}

/// Config with a payout wallet, suitable for building an `AgentContext`.
pub fn test_config() -> AgentConfig {
    let mut config = AgentConfig::default();
    config.withdraw.payout_address = Some(Address::repeat_byte(0x77));
    config.strike.confirmations = 0;
    config
}

pub fn candidate(hash_byte: u8, value_wei: U256) -> PendingCandidate {
    PendingCandidate {
        hash: TxHash::repeat_byte(hash_byte),
        recipient: Some(Address::repeat_byte(0x33)),
        value: value_wei,
        input: Bytes::new(),
        gas_limit: 21_000,
    }
}

#[derive(Debug, Clone)]
enum StreamCommand {
    Notify(TxHash),
    Drop,
}

/// A local `eth_subscribe` server for pending-transaction hashes.
pub struct MockStream {
    pub addr: SocketAddr,
    commands: broadcast::Sender<StreamCommand>,
    connections: Arc<Mutex<Vec<Instant>>>,
    subscribed: Arc<AtomicU32>,
}

impl MockStream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (commands, _) = broadcast::channel(64);
        let connections = Arc::new(Mutex::new(Vec::new()));
        let subscribed = Arc::new(AtomicU32::new(0));

        let tx = commands.clone();
        let conns = connections.clone();
        let subs = subscribed.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                conns.lock().unwrap().push(Instant::now());
                let mut rx = tx.subscribe();
                let subs = subs.clone();
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(socket).await else {
                        return;
                    };
                    let (mut write, mut read) = ws.split();

                    // Wait for the eth_subscribe request.
                    loop {
                        match read.next().await {
                            Some(Ok(Message::Text(text))) if text.contains("eth_subscribe") => break,
                            Some(Ok(_)) => continue,
                            _ => return,
                        }
                    }
                    let ack = r#"{"jsonrpc":"2.0","id":1,"result":"0xfeed"}"#;
                    if write.send(Message::Text(ack.into())).await.is_err() {
                        return;
                    }
                    subs.fetch_add(1, Ordering::SeqCst);

                    loop {
                        tokio::select! {
                            cmd = rx.recv() => match cmd {
                                Ok(StreamCommand::Notify(hash)) => {
                                    let note = format!(
                                        r#"{{"jsonrpc":"2.0","method":"eth_subscription","params":{{"subscription":"0xfeed","result":"{}"}}}}"#,
                                        hash
                                    );
                                    if write.send(Message::Text(note.into())).await.is_err() {
                                        return;
                                    }
                                }
                                Ok(StreamCommand::Drop) | Err(_) => {
                                    let _ = write.send(Message::Close(None)).await;
                                    return;
                                }
                            },
                            frame = read.next() => match frame {
                                Some(Ok(_)) => {}
                                _ => return,
                            },
                        }
                    }
                });
            }
        });

        Self {
            addr,
            commands,
            connections,
            subscribed,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn notify(&self, hash: TxHash) {
        let _ = self.commands.send(StreamCommand::Notify(hash));
    }

    /// Close every live session from the server side.
    pub fn drop_connections(&self) {
        let _ = self.commands.send(StreamCommand::Drop);
    }

    pub fn connection_times(&self) -> Vec<Instant> {
        self.connections.lock().unwrap().clone()
    }

    pub fn subscriptions(&self) -> u32 {
        self.subscribed.load(Ordering::SeqCst)
    }
}

/// Poll `check` every 10 ms until it holds or `limit` passes.
pub async fn wait_until<F: Fn() -> bool>(limit: Duration, check: F) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
