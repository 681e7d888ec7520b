//! Bounded hand-off between the subscription and the candidate pipeline.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use alloy::primitives::TxHash;
use tokio::sync::Notify;

use crate::observability::metrics;

/// FIFO of pending-transaction hashes with drop-oldest overflow.
///
/// The producer never waits: when the queue is full the oldest hash is
/// discarded, since a stale candidate is worth less than a fresh one.
#[derive(Debug)]
pub struct CandidateQueue {
    items: Mutex<VecDeque<TxHash>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl CandidateQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue a hash. Returns the hash evicted to make room, if any.
    pub fn push(&self, hash: TxHash) -> Option<TxHash> {
        if self.is_closed() {
            return None;
        }

        let evicted = {
            let mut items = match self.items.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let evicted = if items.len() >= self.capacity {
                items.pop_front()
            } else {
                None
            };
            items.push_back(hash);
            evicted
        };

        if evicted.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::record_queue_drop();
        }
        self.notify.notify_one();
        evicted
    }

    /// Dequeue the oldest hash without waiting.
    pub fn try_pop(&self) -> Option<TxHash> {
        let mut items = match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        items.pop_front()
    }

    /// Wait for the next hash. Returns `None` once closed and drained.
    pub async fn pop(&self) -> Option<TxHash> {
        loop {
            let notified = self.notify.notified();
            if let Some(hash) = self.try_pop() {
                return Some(hash);
            }
            if self.is_closed() {
                return None;
            }
            notified.await;
        }
    }

    /// Stop accepting hashes and wake every waiting consumer.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        match self.items.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total hashes evicted on overflow.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
