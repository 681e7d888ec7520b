//! Account State: address, cached balance and the nonce cursor.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex as StdMutex, RwLock};

use alloy::primitives::{Address, U256};
use tokio::sync::Mutex;

use crate::blockchain::{BlockchainResult, NativeAmount};
use crate::observability::metrics;
use crate::provider::FailoverProvider;

#[derive(Debug)]
struct CursorInner {
    next: u64,
    stale: bool,
}

/// The signing account's next unused sequence number.
///
/// Reservation and resynchronization hold one async mutex, and the increment
/// happens before the lock is released, so no two reservations can observe
/// the same value. A resync never moves `next` to or below a nonce whose
/// broadcast is still unresolved.
#[derive(Debug)]
pub struct NonceCursor {
    inner: Mutex<CursorInner>,
    /// Reserved nonces whose issuance has not finished yet.
    outstanding: StdMutex<BTreeSet<u64>>,
    /// Lock-free copy of `next` for status readers.
    observed: AtomicU64,
}

/// A reserved nonce, held until its issuance resolves.
///
/// Dropping it (success, failure or cancellation) releases the hold; the
/// nonce itself is still consumed.
#[derive(Debug)]
pub(crate) struct NonceReservation<'a> {
    cursor: &'a NonceCursor,
    nonce: u64,
}

impl NonceReservation<'_> {
    pub(crate) fn nonce(&self) -> u64 {
        self.nonce
    }
}

impl Drop for NonceReservation<'_> {
    fn drop(&mut self) {
        self.cursor.outstanding().remove(&self.nonce);
    }
}

impl NonceCursor {
    pub fn new(start: u64) -> Self {
        metrics::record_next_nonce(start);
        Self {
            inner: Mutex::new(CursorInner {
                next: start,
                stale: false,
            }),
            outstanding: StdMutex::new(BTreeSet::new()),
            observed: AtomicU64::new(start),
        }
    }

    /// Next nonce that will be handed out (absent a resync).
    pub fn current(&self) -> u64 {
        self.observed.load(Ordering::Acquire)
    }

    fn outstanding(&self) -> std::sync::MutexGuard<'_, BTreeSet<u64>> {
        match self.outstanding.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Reserve the next nonce, first resyncing from the network if a
    /// conflict was reported since the last reservation.
    ///
    /// A reserved nonce is never handed back.
    pub(crate) async fn reserve(
        &self,
        provider: &FailoverProvider,
        address: Address,
    ) -> BlockchainResult<NonceReservation<'_>> {
        let mut inner = self.inner.lock().await;

        if inner.stale {
            let pending = provider.get_pending_nonce(address).await?;
            // The node's pending count does not yet include broadcasts still
            // in flight; those nonces stay taken.
            let in_flight = self.outstanding().last().map(|n| n + 1).unwrap_or(0);
            let next = pending.max(in_flight);
            tracing::info!(
                previous = inner.next,
                pending,
                next,
                "Resynchronized nonce from network"
            );
            inner.next = next;
            inner.stale = false;
            metrics::record_nonce_resync(next);
        }

        let nonce = inner.next;
        inner.next += 1;
        self.outstanding().insert(nonce);
        self.observed.store(inner.next, Ordering::Release);
        metrics::record_next_nonce(inner.next);
        Ok(NonceReservation {
            cursor: self,
            nonce,
        })
    }

    /// Nonces reserved but not yet resolved.
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.outstanding().len()
    }

    /// Force a resync from the network before the next reservation.
    pub(crate) async fn mark_stale(&self) {
        self.inner.lock().await.stale = true;
    }

    #[cfg(test)]
    pub(crate) async fn is_stale(&self) -> bool {
        self.inner.lock().await.stale
    }
}

/// The signing account as seen by the agent.
#[derive(Debug)]
pub struct AccountState {
    address: Address,
    cached_balance: RwLock<U256>,
    nonce: NonceCursor,
}

impl AccountState {
    pub fn new(address: Address, balance: U256, next_nonce: u64) -> Self {
        Self {
            address,
            cached_balance: RwLock::new(balance),
            nonce: NonceCursor::new(next_nonce),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Last sampled balance.
    pub fn cached_balance(&self) -> NativeAmount {
        let balance = match self.cached_balance.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        NativeAmount::from_wei(balance)
    }

    pub fn set_cached_balance(&self, balance: U256) {
        match self.cached_balance.write() {
            Ok(mut guard) => *guard = balance,
            Err(poisoned) => *poisoned.into_inner() = balance,
        }
    }

    /// Fetch the balance through the provider and cache it.
    pub async fn refresh_balance(&self, provider: &FailoverProvider) -> BlockchainResult<NativeAmount> {
        let balance = provider.get_balance(self.address).await?;
        self.set_cached_balance(balance);
        Ok(NativeAmount::from_wei(balance))
    }

    pub fn next_nonce(&self) -> u64 {
        self.nonce.current()
    }

    pub(crate) fn nonce(&self) -> &NonceCursor {
        &self.nonce
    }
}
