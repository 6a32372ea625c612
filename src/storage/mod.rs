//! Key to entry mappings with an atomic update primitive.
//!
//! Two backends ship with the crate: a bounded in-memory LRU and a
//! cacache-backed persistent store using a pluggable [`EntrySerializer`]
//! (see [`crate::serialize`]).

mod memory;

pub use memory::InMemoryStorage;

#[cfg(feature = "storage-cacache")]
mod disk;

#[cfg(feature = "storage-cacache")]
pub use disk::CacacheStorage;

use async_trait::async_trait;

use crate::entry::CacheEntry;
use crate::error::Result;

/// Transformation applied atomically to the entry under a key. Returning
/// `None` removes the mapping.
pub type EntryTransformer<'a> =
    &'a (dyn Fn(Option<&CacheEntry>) -> Option<CacheEntry> + Send + Sync);

/// A key to entry mapping safe for concurrent mutation.
///
/// `update` linearizes writes per key: two racing updates for one key are
/// applied one after the other, never interleaved, so neither is lost
/// mid-entry. Implementations own the resources of stored entries and
/// dispose a superseded entry's resource on replacement, removal, and
/// eviction.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Looks up the entry stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;
    /// Stores `entry` under `key`, replacing (and disposing) any previous
    /// entry.
    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()>;
    /// Removes the entry under `key`, disposing its resource.
    async fn remove(&self, key: &str) -> Result<()>;
    /// Applies `transformer` to the current entry under `key` atomically.
    async fn update(&self, key: &str, transformer: EntryTransformer<'_>) -> Result<()>;
    /// Drops every stored entry.
    async fn clear(&self) -> Result<()>;
}
