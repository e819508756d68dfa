//! Handles binding one key/value pair under reclaimable ownership.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::channel::{Reclamation, ReclamationChannel};
use crate::lease::{Lease, ValueCell};

/// Process-wide counter backing [`HandleId`] allocation.
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one handle.
///
/// Every handle gets a fresh id, so two bindings of the same key at
/// different times are distinguishable. Reconciliation relies on this:
/// equal keys never make two handles interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

impl HandleId {
    pub(crate) fn next() -> Self {
        HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One key/value binding whose value may be reclaimed.
///
/// A handle owns two views of its value: a retained strong hold (the cache's
/// own share of ownership) and a weak view used by [`peek`](Handle::peek).
/// Dropping the handle or calling [`revoke`](Handle::revoke) releases the
/// retained hold; from then on the value survives only as long as leases
/// handed out earlier do. When the last owner is gone, the hook registered
/// at construction posts this handle's key and id on the channel.
pub struct Handle<V> {
    id: HandleId,
    retained: Option<Arc<ValueCell<V>>>,
    value: Weak<ValueCell<V>>,
}

impl<V> Handle<V> {
    /// Bind `value` to `key`, wiring reclamation notices to `channel`.
    ///
    /// The key is captured by the reclamation hook so the eventual notice
    /// can name the mapping it retires.
    pub fn new<K>(key: K, value: V, channel: &ReclamationChannel<K>) -> Self
    where
        K: Send + Sync + 'static,
    {
        let id = HandleId::next();
        let channel = channel.clone();
        let cell = ValueCell::new(
            value,
            Box::new(move || channel.notify(Reclamation { key, id })),
        );
        Self {
            id,
            value: Arc::downgrade(&cell),
            retained: Some(cell),
        }
    }

    /// This handle's identity
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Access the value if it has not been reclaimed.
    ///
    /// The returned lease is a new strong owner. Once this returns `None`
    /// it returns `None` forever: a reclaimed value is never resurrected.
    pub fn peek(&self) -> Option<Lease<V>> {
        self.value.upgrade().map(Lease::from_cell)
    }

    /// Release the retained hold on the value.
    ///
    /// Returns `true` if a hold was actually released. If no leases are
    /// outstanding the value is reclaimed immediately and the notice is on
    /// the channel by the time this returns; otherwise reclamation waits
    /// for the last lease.
    pub fn revoke(&mut self) -> bool {
        self.retained.take().is_some()
    }

    /// Whether the retained hold is still in place
    pub fn is_retained(&self) -> bool {
        self.retained.is_some()
    }
}

impl<V> fmt::Debug for Handle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("retained", &self.retained.is_some())
            .field("reachable", &(self.value.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ReclamationChannel<&'static str> {
        ReclamationChannel::new()
    }

    #[test]
    fn each_handle_gets_a_distinct_id() {
        let channel = channel();
        let first = Handle::new("same-key", 1_u32, &channel);
        let second = Handle::new("same-key", 1_u32, &channel);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn peek_returns_the_value_while_retained() {
        let channel = channel();
        let handle = Handle::new("k", String::from("v"), &channel);

        let lease = handle.peek().expect("retained value must be reachable");
        assert_eq!(*lease, "v");
        assert!(handle.is_retained());
        assert_eq!(channel.pending(), 0);
    }

    #[test]
    fn revoke_without_leases_reclaims_immediately() {
        let channel = channel();
        let mut handle = Handle::new("k", 9_u8, &channel);
        let id = handle.id();

        assert!(handle.revoke());
        assert!(!handle.is_retained());
        assert!(handle.peek().is_none());

        let notices: Vec<_> = channel.drain().collect();
        assert_eq!(notices, vec![Reclamation { key: "k", id }]);
    }

    #[test]
    fn revoke_is_idempotent() {
        let channel = channel();
        let mut handle = Handle::new("k", 9_u8, &channel);

        assert!(handle.revoke());
        assert!(!handle.revoke());
        assert_eq!(channel.drain().count(), 1);
    }

    #[test]
    fn outstanding_lease_defers_reclamation() {
        let channel = channel();
        let mut handle = Handle::new("k", 3_u64, &channel);
        let lease = handle.peek().expect("value reachable");

        handle.revoke();
        assert!(handle.peek().is_some());
        assert_eq!(channel.pending(), 0);

        drop(lease);
        assert!(handle.peek().is_none());
        assert_eq!(channel.pending(), 1);
    }

    #[test]
    fn dropping_the_handle_releases_its_hold() {
        let channel = channel();
        let handle = Handle::new("k", 5_i32, &channel);
        let id = handle.id();

        drop(handle);
        let notices: Vec<_> = channel.drain().collect();
        assert_eq!(notices, vec![Reclamation { key: "k", id }]);
    }

    #[test]
    fn reclamation_fires_once_across_many_leases() {
        let channel = channel();
        let mut handle = Handle::new("k", 0_u8, &channel);
        let leases: Vec<_> = (0..8).filter_map(|_| handle.peek()).collect();
        assert_eq!(leases.len(), 8);

        handle.revoke();
        drop(leases);
        assert_eq!(channel.drain().count(), 1);
        assert!(handle.peek().is_none());
    }
}
