//! The explicit agent context handed to every component.
//!
//! Replaces process-wide globals: the provider, the account and the issuer
//! (sole owner of nonce reservation) are created once after boot and shared
//! by `Arc`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::account::AccountState;
use crate::blockchain::Wallet;
use crate::config::AgentConfig;
use crate::heartbeat::StatusReporter;
use crate::issuer::TxIssuer;
use crate::provider::FailoverProvider;
use crate::watcher::WatcherState;

#[derive(Clone)]
pub struct AgentContext {
    pub config: Arc<AgentConfig>,
    pub provider: Arc<FailoverProvider>,
    pub account: Arc<AccountState>,
    pub issuer: Arc<TxIssuer>,
    pub reporter: Arc<StatusReporter>,
    pub watcher_state: watch::Receiver<WatcherState>,
}

impl AgentContext {
    pub fn new(
        config: Arc<AgentConfig>,
        provider: Arc<FailoverProvider>,
        account: Arc<AccountState>,
        wallet: Wallet,
        watcher_state: watch::Receiver<WatcherState>,
    ) -> Self {
        let issuer = Arc::new(TxIssuer::new(
            provider.clone(),
            account.clone(),
            wallet,
            config.strike.clone(),
            config.withdraw.clone(),
        ));
        let reporter = Arc::new(StatusReporter::new(
            provider.clone(),
            account.clone(),
            Duration::from_secs(config.heartbeat.interval_secs),
        ));

        Self {
            config,
            provider,
            account,
            issuer,
            reporter,
            watcher_state,
        }
    }

    /// Current watcher state, `disconnected` when the watcher is not running.
    pub fn watcher_state(&self) -> WatcherState {
        *self.watcher_state.borrow()
    }
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext")
            .field("address", &self.account.address())
            .field("provider", &self.provider)
            .field("watcher", &self.watcher_state())
            .finish_non_exhaustive()
    }
}
