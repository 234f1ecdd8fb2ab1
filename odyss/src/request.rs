//! Request lifecycle tracking shared by the state containers.
//!
//! Every gateway call a container issues gets a ticket carrying a
//! monotonically increasing id. When the call settles, its result is applied
//! only if no newer request of the same kind was started in the meantime.
//! The container's loading flag stays set while any ticket is outstanding.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Identifier of one issued request
pub type RequestId = u64;

/// Handle for an in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket<K> {
    pub kind: K,
    pub id: RequestId,
}

/// Per-kind tracker of the newest issued request
#[derive(Debug)]
pub struct RequestTracker<K> {
    next_id: AtomicU64,
    pending: AtomicUsize,
    latest: Mutex<HashMap<K, RequestId>>,
}

impl<K> Default for RequestTracker<K> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: AtomicUsize::new(0),
            latest: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Copy + Eq + Hash> RequestTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket, superseding any outstanding request of the same kind
    pub fn begin(&self, kind: K) -> Ticket<K> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(kind, id);
        Ticket { kind, id }
    }

    /// Whether the ticket is still the newest of its kind
    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&ticket.kind)
            == Some(&ticket.id)
    }

    /// Settle a ticket; returns whether its result should be applied
    pub fn finish(&self, ticket: &Ticket<K>) -> bool {
        // Saturate: a ticket is settled exactly once by its owner
        let _ = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        self.is_current(ticket)
    }

    /// Whether any issued request has not settled yet
    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Load,
        Create,
    }

    #[test]
    fn test_single_request_is_current() {
        let tracker = RequestTracker::new();
        let ticket = tracker.begin(Kind::Load);
        assert!(tracker.has_pending());
        assert!(tracker.finish(&ticket));
        assert!(!tracker.has_pending());
    }

    #[test]
    fn test_newer_request_supersedes_older() {
        let tracker = RequestTracker::new();
        let first = tracker.begin(Kind::Load);
        let second = tracker.begin(Kind::Load);
        assert!(second.id > first.id);

        // Settlement order does not matter, only issue order
        assert!(tracker.finish(&second));
        assert!(!tracker.finish(&first));
        assert!(!tracker.has_pending());
    }

    #[test]
    fn test_kinds_are_independent() {
        let tracker = RequestTracker::new();
        let load = tracker.begin(Kind::Load);
        let create = tracker.begin(Kind::Create);

        assert!(tracker.finish(&load));
        assert!(tracker.has_pending());
        assert!(tracker.finish(&create));
    }
}
