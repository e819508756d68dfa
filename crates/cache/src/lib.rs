//! Cache with reclaimable values
//!
//! This crate provides an associative cache whose values can be handed back
//! to the allocator while the cache still remembers the key. Each entry
//! binds its value through a [`Handle`] carrying a unique identity; readers
//! receive [`Lease`]s that co-own the value. When the last owner of a value
//! is released, a reclamation hook posts the handle's key and identity on a
//! [`ReclamationChannel`], and the cache drops the matching entry the next
//! time it is touched.
//!
//! Identity is what keeps that lazy cleanup honest: a notice only retires
//! the entry that produced it. Replace a key between reclamation and
//! reconciliation and the stale notice is discarded instead of evicting the
//! fresh value.
//!
//! ```
//! use clawback_cache::Cache;
//!
//! let mut cache = Cache::new();
//! cache.put("config/root", String::from("/etc/app"));
//!
//! let lease = cache.get(&"config/root").expect("just inserted");
//! assert_eq!(*lease, "/etc/app");
//!
//! // Give the retained hold back; the value survives only through the lease.
//! cache.revoke(&"config/root");
//! assert!(cache.get(&"config/root").is_some());
//!
//! drop(lease);
//! assert!(cache.get(&"config/root").is_none());
//! ```
//!
//! The cache is single-writer by construction: reconciling operations take
//! `&mut self`, while leases and reclamation notices may cross threads
//! freely.

pub mod channel;
pub mod errors;
pub mod handle;
pub mod lease;
pub mod store;

pub use channel::{Reclamation, ReclamationChannel};
pub use errors::{CacheError, Result};
pub use handle::{Handle, HandleId};
pub use lease::Lease;
pub use store::{Cache, CacheStats};
