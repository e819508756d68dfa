//! Shared ownership of cached values.
//!
//! Every cached value lives in a reference-counted cell. The cache holds one
//! strong reference (its retained hold) and each outstanding [`Lease`] holds
//! another. When the last strong reference goes away the cell fires its
//! reclamation hook exactly once, on whichever thread performed the final
//! release, and then drops the value itself.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Callback fired when a value loses its last owner.
pub(crate) type ReclaimHook = Box<dyn FnOnce() + Send + Sync>;

/// Reference-counted cell owning one cached value.
///
/// The hook is consumed by `Drop`, so it runs at most once no matter how
/// many owners the cell accumulated during its life.
pub(crate) struct ValueCell<V> {
    value: V,
    on_reclaim: Option<ReclaimHook>,
}

impl<V> ValueCell<V> {
    pub(crate) fn new(value: V, on_reclaim: ReclaimHook) -> Arc<Self> {
        Arc::new(Self {
            value,
            on_reclaim: Some(on_reclaim),
        })
    }
}

impl<V> Drop for ValueCell<V> {
    fn drop(&mut self) {
        if let Some(hook) = self.on_reclaim.take() {
            hook();
        }
    }
}

/// Strong reference to a cached value.
///
/// A lease keeps its value alive independently of the cache: revoking or
/// replacing the entry does not invalidate leases already handed out. Cloning
/// acquires another reference, dropping releases one, and the value is
/// reclaimed when the last reference anywhere is gone.
///
/// Leases dereference to the value:
///
/// ```
/// use clawback_cache::Cache;
///
/// let mut cache = Cache::new();
/// cache.put("answer", 42);
/// let lease = cache.get(&"answer").unwrap();
/// assert_eq!(*lease, 42);
/// ```
pub struct Lease<V> {
    cell: Arc<ValueCell<V>>,
}

impl<V> Lease<V> {
    pub(crate) fn from_cell(cell: Arc<ValueCell<V>>) -> Self {
        Self { cell }
    }
}

impl<V> Clone for Lease<V> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<V> Deref for Lease<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.cell.value
    }
}

impl<V: fmt::Debug> fmt::Debug for Lease<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Lease").field(&self.cell.value).finish()
    }
}
