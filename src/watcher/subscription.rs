//! Pending-transaction subscription over a WebSocket JSON-RPC stream.
//!
//! # States
//! ```text
//! Disconnected → Connecting → Subscribed
//!      ↑                          │
//!      └──── transport closed ────┘  (retry after policy delay, forever)
//! ```

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::TxHash;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::observability::{metrics, redact_url, scrub_url};
use crate::resilience::RetryPolicy;
use crate::watcher::queue::CandidateQueue;

const SUBSCRIBE_REQUEST_ID: u64 = 1;

/// Connection state of the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Disconnected,
    Connecting,
    Subscribed,
}

impl WatcherState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatcherState::Disconnected => "disconnected",
            WatcherState::Connecting => "connecting",
            WatcherState::Subscribed => "subscribed",
        }
    }
}

/// Why a subscription session ended.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("subscription refused: {0}")]
    Subscribe(String),

    #[error("transport closed: {0}")]
    TransportClosed(String),
}

#[derive(Debug, Serialize)]
struct SubscribeRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (&'static str,),
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    id: Option<u64>,
    result: Option<serde_json::Value>,
    error: Option<StreamError>,
    method: Option<String>,
    params: Option<NotificationParams>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    subscription: String,
    result: serde_json::Value,
}

/// Extract the transaction hash from a notification payload.
///
/// Nodes send either the bare hash or, with full-transaction subscriptions,
/// an object carrying a `hash` field.
fn notified_hash(result: &serde_json::Value) -> Option<TxHash> {
    let raw = match result {
        serde_json::Value::String(s) => s.as_str(),
        serde_json::Value::Object(map) => map.get("hash")?.as_str()?,
        _ => return None,
    };
    TxHash::from_str(raw).ok()
}

/// Keeps a `newPendingTransactions` subscription alive and feeds hashes
/// into the candidate queue.
pub struct MempoolWatcher {
    url: String,
    policy: RetryPolicy,
    queue: Arc<CandidateQueue>,
    state_tx: watch::Sender<WatcherState>,
}

impl MempoolWatcher {
    pub fn new(url: impl Into<String>, policy: RetryPolicy, queue: Arc<CandidateQueue>) -> Self {
        let (state_tx, _) = watch::channel(WatcherState::Disconnected);
        Self {
            url: url.into(),
            policy,
            queue,
            state_tx,
        }
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> WatcherState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: WatcherState) {
        self.state_tx.send_replace(state);
    }

    /// Run sessions until shutdown, reconnecting after every close.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(url = %redact_url(&self.url), "Mempool watcher starting");
        let mut attempt = 0u32;

        loop {
            self.set_state(WatcherState::Connecting);

            let err = tokio::select! {
                err = self.session() => err,
                _ = shutdown.recv() => {
                    tracing::info!("Mempool watcher received shutdown signal, exiting loop");
                    break;
                }
            };

            if self.state() == WatcherState::Subscribed {
                attempt = 0;
            }
            self.set_state(WatcherState::Disconnected);
            attempt = attempt.saturating_add(1);

            let delay = self.policy.delay_for(attempt);
            tracing::warn!(error = %err, attempt, delay = ?delay, "Mempool stream down, reconnecting");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Mempool watcher received shutdown signal, exiting loop");
                    break;
                }
            }
            metrics::record_watcher_reconnect();
        }

        self.set_state(WatcherState::Disconnected);
        self.queue.close();
    }

    /// One connection: connect, subscribe, forward notifications until the
    /// transport ends. Always ends in an error describing why.
    async fn session(&self) -> WatcherError {
        let (stream, _) = match connect_async(self.url.as_str()).await {
            Ok(connected) => connected,
            Err(e) => return WatcherError::Connect(scrub_url(&e.to_string(), &self.url)),
        };
        let (mut write, mut read) = stream.split();

        let request = SubscribeRequest {
            jsonrpc: "2.0",
            id: SUBSCRIBE_REQUEST_ID,
            method: "eth_subscribe",
            params: ("newPendingTransactions",),
        };
        let payload = match serde_json::to_string(&request) {
            Ok(p) => p,
            Err(e) => return WatcherError::Subscribe(e.to_string()),
        };
        if let Err(e) = write.send(Message::Text(payload.into())).await {
            return WatcherError::TransportClosed(e.to_string());
        }

        let mut subscription: Option<String> = None;

        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    let Ok(message) = serde_json::from_str::<StreamMessage>(&text) else {
                        tracing::debug!("Ignoring unparseable stream message");
                        continue;
                    };

                    if message.id == Some(SUBSCRIBE_REQUEST_ID) {
                        if let Some(error) = message.error {
                            return WatcherError::Subscribe(format!(
                                "{} (code {})",
                                error.message, error.code
                            ));
                        }
                        if let Some(id) = message.result.as_ref().and_then(|r| r.as_str()) {
                            tracing::info!(subscription = %id, "Subscribed to pending transactions");
                            subscription = Some(id.to_string());
                            self.set_state(WatcherState::Subscribed);
                        }
                        continue;
                    }

                    if message.method.as_deref() != Some("eth_subscription") {
                        continue;
                    }
                    let Some(params) = message.params else {
                        continue;
                    };
                    if subscription.as_deref() != Some(params.subscription.as_str()) {
                        continue;
                    }

                    match notified_hash(&params.result) {
                        Some(hash) => {
                            if let Some(evicted) = self.queue.push(hash) {
                                tracing::debug!(evicted = %evicted, "Candidate queue full, dropped oldest");
                            }
                        }
                        None => tracing::debug!("Notification without a transaction hash"),
                    }
                }
                Ok(Message::Ping(data)) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        return WatcherError::TransportClosed(e.to_string());
                    }
                }
                Ok(Message::Close(frame)) => {
                    let reason = frame
                        .map(|f| format!("close frame {}: {}", f.code, f.reason))
                        .unwrap_or_else(|| "close frame".to_string());
                    return WatcherError::TransportClosed(reason);
                }
                Ok(_) => {}
                Err(e) => return WatcherError::TransportClosed(e.to_string()),
            }
        }

        WatcherError::TransportClosed("stream ended".to_string())
    }
}

impl std::fmt::Debug for MempoolWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MempoolWatcher")
            .field("url", &redact_url(&self.url))
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish()
    }
}
