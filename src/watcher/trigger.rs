//! Trigger predicate applied to fetched candidates.
//!
//! The heuristic itself is pluggable; the issuer's own value and balance
//! guards run after it regardless.

use crate::blockchain::PendingCandidate;

pub trait TriggerPredicate: Send + Sync {
    fn should_trigger(&self, candidate: &PendingCandidate) -> bool;
}

/// Fires on any candidate with a recipient (i.e. not a contract creation).
#[derive(Debug, Clone, Copy, Default)]
pub struct HasRecipient;

impl TriggerPredicate for HasRecipient {
    fn should_trigger(&self, candidate: &PendingCandidate) -> bool {
        candidate.recipient.is_some()
    }
}

impl<F> TriggerPredicate for F
where
    F: Fn(&PendingCandidate) -> bool + Send + Sync,
{
    fn should_trigger(&self, candidate: &PendingCandidate) -> bool {
        self(candidate)
    }
}
