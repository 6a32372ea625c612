use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

use super::{EntryTransformer, Storage};
use crate::entry::CacheEntry;
use crate::error::Result;
use crate::serialize::{BincodeEntrySerializer, EntrySerializer};

/// Persistent storage backed by [`cacache`](https://github.com/zkat/cacache-rs),
/// entries encoded through a pluggable [`EntrySerializer`].
///
/// Read failures and undecodable entries degrade to a miss; an undecodable
/// entry is additionally dropped from the index so it is not retried on
/// every lookup.
pub struct CacacheStorage {
    path: PathBuf,
    serializer: Arc<dyn EntrySerializer>,
    // cacache has no native read-modify-write; `update` serializes racing
    // writers per key through these.
    update_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl std::fmt::Debug for CacacheStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacacheStorage").field("path", &self.path).finish_non_exhaustive()
    }
}

impl CacacheStorage {
    /// Storage under `path` using the default bincode serializer.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_serializer(path, Arc::new(BincodeEntrySerializer::default()))
    }

    /// Storage under `path` with a custom entry serializer.
    pub fn with_serializer(path: impl Into<PathBuf>, serializer: Arc<dyn EntrySerializer>) -> Self {
        Self { path: path.into(), serializer, update_locks: DashMap::new() }
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.update_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl Storage for CacacheStorage {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let bytes = match cacache::read(&self.path, key).await {
            Ok(bytes) => bytes,
            Err(cacache::Error::EntryNotFound(_, _)) => return Ok(None),
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return Ok(None);
            }
        };
        match self.serializer.read(&bytes) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(key, error = %e, "undecodable cache entry, dropping");
                let _ = cacache::remove(&self.path, key).await;
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let bytes = self.serializer.write(&entry).await?;
        cacache::write(&self.path, key, bytes).await?;
        if let Some(resource) = entry.resource() {
            // The persisted copy is now authoritative; the transient
            // resource handed in can be released.
            resource.dispose();
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match cacache::remove(&self.path, key).await {
            Ok(()) => Ok(()),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, key: &str, transformer: EntryTransformer<'_>) -> Result<()> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;
        let current = self.get(key).await?;
        match transformer(current.as_ref()) {
            Some(next) => self.put(key, next).await,
            None => self.remove(key).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        cacache::clear(&self.path).await?;
        Ok(())
    }
}
