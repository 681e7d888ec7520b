//! Shutdown coordination for the agent.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Every long-running task (HTTP server, health monitor, heartbeat, watcher,
/// pipeline) holds a receiver and exits its loop when the signal fires.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
