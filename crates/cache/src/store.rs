//! The cache map: key lookup, replacement, and lazy reconciliation.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::channel::ReclamationChannel;
use crate::errors::{CacheError, Result};
use crate::handle::Handle;
use crate::lease::Lease;

#[cfg(test)]
mod tests_proptest;

/// Operation counters for one cache.
///
/// Plain counters, updated by the owning cache; snapshot with
/// [`Cache::stats`]. Serializable so callers can ship them to whatever
/// reporting they already have.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that returned a value
    pub hits: u64,
    /// Lookups that returned nothing
    pub misses: u64,
    /// Entries stored by `put`
    pub writes: u64,
    /// Entries removed by `remove`
    pub removals: u64,
    /// Entries dropped during reconciliation after their value was reclaimed
    pub reclaimed: u64,
}

/// Map from keys to values whose storage can be reclaimed.
///
/// Entries hold their value through a [`Handle`]: a retained strong hold
/// plus the identity that ties reclamation notices back to the binding that
/// produced them. Every operation starts by draining the reclamation
/// channel and dropping the entries whose notices match the stored handle,
/// so reclaimed values disappear from the map lazily but before the
/// operation observes it.
///
/// The map itself is not internally synchronized; `&mut self` on every
/// reconciling operation makes that explicit. What does cross threads is
/// ownership of the values: leases may migrate and die anywhere, and their
/// notices are picked up here on the next operation.
///
/// ```
/// use clawback_cache::Cache;
///
/// let mut cache = Cache::new();
/// cache.put("config/root", String::from("/etc/app"));
///
/// // A lease keeps the value alive independently of the cache.
/// let lease = cache.get(&"config/root").expect("just inserted");
///
/// // Releasing the retained hold marks the value reclaimable; the entry
/// // disappears once the last lease is gone.
/// cache.revoke(&"config/root");
/// drop(lease);
/// assert!(cache.get(&"config/root").is_none());
/// ```
pub struct Cache<K, V> {
    mapping: HashMap<K, Handle<V>>,
    channel: ReclamationChannel<K>,
    stats: CacheStats,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            mapping: HashMap::new(),
            channel: ReclamationChannel::new(),
            stats: CacheStats::default(),
        }
    }

    /// Create an empty cache sized for roughly `capacity` entries.
    ///
    /// Fails if the hint cannot be reserved up front, so a misconfigured
    /// capacity surfaces at construction instead of on first insert.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut mapping = HashMap::new();
        mapping.try_reserve(capacity).map_err(|e| {
            CacheError::configuration(format!(
                "cannot reserve capacity for {} entries: {}",
                capacity, e
            ))
        })?;
        Ok(Self {
            mapping,
            channel: ReclamationChannel::new(),
            stats: CacheStats::default(),
        })
    }

    /// Drain pending reclamation notices and drop the entries they retire.
    ///
    /// An entry is removed only when the stored handle's identity matches
    /// the notice. A notice for a binding that was since replaced or
    /// removed finds no match and is discarded, which also makes duplicate
    /// and out-of-order notices harmless.
    fn reconcile(&mut self) {
        let mut dropped = 0_u64;
        for notice in self.channel.drain() {
            let matches_current = self
                .mapping
                .get(&notice.key)
                .is_some_and(|current| current.id() == notice.id);
            if matches_current {
                self.mapping.remove(&notice.key);
                dropped += 1;
            } else {
                trace!("discarding reclamation notice for a superseded binding");
            }
        }
        if dropped > 0 {
            self.stats.reclaimed += dropped;
            debug!("reconciled {} reclaimed entries", dropped);
        }
    }

    /// Look up the value for `key`.
    ///
    /// Returns a fresh lease on the value, or `None` when the key is absent
    /// or its value has been reclaimed. A reclaimed-but-unreconciled entry
    /// reports `None` without being removed here; reconciliation stays the
    /// channel's job.
    pub fn get(&mut self, key: &K) -> Option<Lease<V>> {
        self.reconcile();
        match self.mapping.get(key).and_then(Handle::peek) {
            Some(lease) => {
                self.stats.hits += 1;
                Some(lease)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous binding.
    ///
    /// Returns the previous value if one was still reachable. The
    /// replacement gets a fresh identity, so a late notice for the
    /// superseded binding can never evict it.
    pub fn put(&mut self, key: K, value: V) -> Option<Lease<V>> {
        self.reconcile();
        let handle = Handle::new(key.clone(), value, &self.channel);
        let previous = self.mapping.insert(key, handle);
        self.stats.writes += 1;
        // Peek before the superseded handle drops its hold; the notice it
        // may post is discarded later because the stored id has moved on.
        previous.and_then(|superseded| superseded.peek())
    }

    /// Store every `(key, value)` pair, in iteration order.
    ///
    /// Sequential puts, not an atomic batch: later pairs win on duplicate
    /// keys.
    pub fn put_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.put(key, value);
        }
    }

    /// Remove the entry for `key`, returning its value if still reachable
    pub fn remove(&mut self, key: &K) -> Option<Lease<V>> {
        self.reconcile();
        let removed = self.mapping.remove(key)?;
        self.stats.removals += 1;
        removed.peek()
    }

    /// Whether an entry for `key` is structurally present.
    ///
    /// Can report `true` for an entry whose value is already gone when the
    /// notice has not arrived yet; `get` is the reachability check.
    pub fn contains_key(&mut self, key: &K) -> bool {
        self.reconcile();
        self.mapping.contains_key(key)
    }

    /// Whether any reachable value equals `value`
    pub fn contains_value(&mut self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.reconcile();
        self.mapping
            .values()
            .any(|handle| handle.peek().is_some_and(|lease| *lease == *value))
    }

    /// Number of entries after reconciliation
    pub fn len(&mut self) -> usize {
        self.reconcile();
        self.mapping.len()
    }

    /// Whether the cache holds no entries after reconciliation
    pub fn is_empty(&mut self) -> bool {
        self.reconcile();
        self.mapping.is_empty()
    }

    /// Drop every entry.
    ///
    /// Values still covered by leases live on outside the cache; notices
    /// they post later find no matching entry and are discarded.
    pub fn clear(&mut self) {
        self.reconcile();
        let evicted = self.mapping.len();
        self.mapping.clear();
        if evicted > 0 {
            debug!("cleared {} entries", evicted);
        }
    }

    /// Snapshot of the keys currently mapped
    pub fn keys(&mut self) -> Vec<K> {
        self.reconcile();
        self.mapping.keys().cloned().collect()
    }

    /// Snapshot of the values currently mapped.
    ///
    /// Each slot is the peek of one entry at snapshot time; a slot is
    /// `None` when that entry's value was reclaimed but its notice has not
    /// been drained yet. The embedded leases keep their values alive for
    /// as long as the snapshot is held.
    pub fn values(&mut self) -> Vec<Option<Lease<V>>> {
        self.reconcile();
        self.mapping.values().map(Handle::peek).collect()
    }

    /// Snapshot of `(key, value)` pairs, peeked once at snapshot time.
    ///
    /// Later reclamation or removal does not reach into a snapshot already
    /// returned.
    pub fn entries(&mut self) -> Vec<(K, Option<Lease<V>>)> {
        self.reconcile();
        self.mapping
            .iter()
            .map(|(key, handle)| (key.clone(), handle.peek()))
            .collect()
    }

    /// Release the retained hold for `key`, keeping the entry in place.
    ///
    /// The value is reclaimed immediately when no leases are out, and the
    /// entry then falls away on the next operation; with leases
    /// outstanding the value survives until the last one drops. Returns
    /// whether a hold was released.
    pub fn revoke(&mut self, key: &K) -> bool {
        self.reconcile();
        match self.mapping.get_mut(key) {
            Some(handle) => handle.revoke(),
            None => false,
        }
    }

    /// Release every retained hold, returning how many were released.
    ///
    /// The wholesale give-back for memory pressure: values without
    /// outstanding leases are reclaimed on the spot, the rest when their
    /// last lease drops.
    pub fn revoke_all(&mut self) -> usize {
        self.reconcile();
        let mut released = 0;
        for handle in self.mapping.values_mut() {
            if handle.revoke() {
                released += 1;
            }
        }
        if released > 0 {
            debug!("released {} retained values", released);
        }
        released
    }

    /// Snapshot of the operation counters
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("entries", &self.mapping.len())
            .field("pending_notices", &self.channel.pending())
            .field("stats", &self.stats)
            .finish()
    }
}
