//! Consumer loop: hash → full transaction → trigger predicate → issuer.

use std::sync::Arc;

use alloy::primitives::TxHash;
use tokio::sync::{broadcast, Semaphore};

use crate::issuer::{StrikeOutcome, TxIssuer};
use crate::observability::metrics;
use crate::provider::FailoverProvider;
use crate::watcher::queue::CandidateQueue;
use crate::watcher::trigger::TriggerPredicate;

/// Drains the candidate queue in arrival order.
///
/// Detail fetches run concurrently up to `max_inflight`; a failed fetch
/// loses that one candidate and nothing else.
pub struct CandidatePipeline {
    queue: Arc<CandidateQueue>,
    provider: Arc<FailoverProvider>,
    issuer: Arc<TxIssuer>,
    trigger: Arc<dyn TriggerPredicate>,
    inflight: Arc<Semaphore>,
}

impl CandidatePipeline {
    pub fn new(
        queue: Arc<CandidateQueue>,
        provider: Arc<FailoverProvider>,
        issuer: Arc<TxIssuer>,
        trigger: Arc<dyn TriggerPredicate>,
        max_inflight: usize,
    ) -> Self {
        Self {
            queue,
            provider,
            issuer,
            trigger,
            inflight: Arc::new(Semaphore::new(max_inflight.max(1))),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Candidate pipeline starting");

        loop {
            let hash = tokio::select! {
                next = self.queue.pop() => match next {
                    Some(hash) => hash,
                    None => break,
                },
                _ = shutdown.recv() => {
                    tracing::info!("Candidate pipeline received shutdown signal, exiting loop");
                    break;
                }
            };

            let permit = match self.inflight.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let provider = self.provider.clone();
            let issuer = self.issuer.clone();
            let trigger = self.trigger.clone();
            tokio::spawn(async move {
                process_candidate(hash, &provider, &issuer, trigger.as_ref()).await;
                drop(permit);
            });
        }
    }
}

/// Fetch, evaluate and (maybe) strike on one candidate. Never fails.
pub async fn process_candidate(
    hash: TxHash,
    provider: &FailoverProvider,
    issuer: &TxIssuer,
    trigger: &dyn TriggerPredicate,
) {
    let candidate = match provider.get_transaction(hash).await {
        Ok(Some(candidate)) => candidate,
        Ok(None) => {
            metrics::record_candidate("not_found");
            tracing::trace!(candidate = %hash, "Candidate no longer known");
            return;
        }
        Err(e) => {
            metrics::record_candidate("fetch_failed");
            tracing::debug!(candidate = %hash, error = %e, "Candidate fetch failed");
            return;
        }
    };

    if !trigger.should_trigger(&candidate) {
        metrics::record_candidate("ignored");
        return;
    }

    match issuer.strike(&candidate).await {
        Ok(StrikeOutcome::Submitted(tx)) => {
            metrics::record_candidate("struck");
            tracing::info!(candidate = %hash, tx_hash = %tx.hash, nonce = tx.nonce, "Strike submitted");
        }
        Ok(StrikeOutcome::Skipped(_)) => {
            metrics::record_candidate("skipped");
        }
        Err(e) => {
            metrics::record_candidate("strike_failed");
            tracing::warn!(candidate = %hash, error = %e, "Strike failed");
        }
    }
}
