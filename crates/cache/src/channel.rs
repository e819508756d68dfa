//! Delivery of reclamation notices from value owners to the cache.
//!
//! Reclamation hooks run on whichever thread releases a value's last owner,
//! so the channel has to accept notices from any thread without blocking.
//! The cache drains it opportunistically at the start of every operation;
//! a notice that arrives mid-drain is simply picked up by the next one.

use std::fmt;
use std::sync::Arc;

use crossbeam::queue::SegQueue;

use crate::handle::HandleId;

/// Notice that the value bound by one handle has been reclaimed.
///
/// Carries the key the handle was stored under so the cache can reconcile
/// without scanning, and the handle identity so a notice for a superseded
/// binding can never evict its replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reclamation<K> {
    /// Key the retired handle was stored under
    pub key: K,
    /// Identity of the retired handle
    pub id: HandleId,
}

/// Unbounded multi-producer queue of reclamation notices.
///
/// Clones share the same underlying queue. Producers never block and never
/// fail; ordering between notices from different threads follows whatever
/// order the pushes landed in.
pub struct ReclamationChannel<K> {
    queue: Arc<SegQueue<Reclamation<K>>>,
}

impl<K> ReclamationChannel<K> {
    /// Create an empty channel
    pub fn new() -> Self {
        Self {
            queue: Arc::new(SegQueue::new()),
        }
    }

    /// Enqueue a notice without blocking
    pub fn notify(&self, notice: Reclamation<K>) {
        self.queue.push(notice);
    }

    /// Drain the notices queued so far.
    ///
    /// The iterator pops lazily until the queue reports empty, so notices
    /// pushed while it runs are observed too. It may yield nothing.
    pub fn drain(&self) -> Drain<'_, K> {
        Drain { queue: &self.queue }
    }

    /// Number of notices currently waiting
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<K> Clone for ReclamationChannel<K> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<K> Default for ReclamationChannel<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for ReclamationChannel<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReclamationChannel")
            .field("pending", &self.queue.len())
            .finish()
    }
}

/// Iterator returned by [`ReclamationChannel::drain`]
pub struct Drain<'a, K> {
    queue: &'a SegQueue<Reclamation<K>>,
}

impl<K> Iterator for Drain<'_, K> {
    type Item = Reclamation<K>;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop()
    }
}
