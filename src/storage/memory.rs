use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{EntryTransformer, Storage};
use crate::entry::CacheEntry;
use crate::error::Result;

/// Bounded in-memory storage with least-recently-used eviction.
///
/// All operations take one short critical section, which also makes
/// `update` linearizable per key.
#[derive(Debug)]
pub struct InMemoryStorage {
    inner: Mutex<Inner>,
    max_entries: usize,
}

#[derive(Debug)]
struct Inner {
    map: HashMap<String, Slot>,
    tick: u64,
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    last_used: u64,
}

impl InMemoryStorage {
    /// Storage holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { map: HashMap::new(), tick: 0 }),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn store(&mut self, key: &str, entry: CacheEntry, max_entries: usize) {
        let tick = self.next_tick();
        if let Some(old) = self.map.insert(key.to_string(), Slot { entry, last_used: tick }) {
            dispose_replaced(&old.entry, self.map.get(key).map(|slot| &slot.entry));
        }
        while self.map.len() > max_entries {
            let Some(oldest) = self
                .map
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            if let Some(evicted) = self.map.remove(&oldest) {
                dispose_replaced(&evicted.entry, None);
            }
        }
    }

    fn drop_key(&mut self, key: &str) {
        if let Some(old) = self.map.remove(key) {
            dispose_replaced(&old.entry, None);
        }
    }
}

// A superseded entry's resource is disposed unless the replacement still
// refers to the same content.
fn dispose_replaced(old: &CacheEntry, new: Option<&CacheEntry>) {
    if let Some(resource) = old.resource() {
        let shared = new
            .and_then(|entry| entry.resource())
            .is_some_and(|kept| kept.same_as(resource));
        if !shared {
            resource.dispose();
        }
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        Ok(inner.map.get_mut(key).map(|slot| {
            slot.last_used = tick;
            slot.entry.clone()
        }))
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
        self.inner.lock().store(key, entry, self.max_entries);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.lock().drop_key(key);
        Ok(())
    }

    async fn update(&self, key: &str, transformer: EntryTransformer<'_>) -> Result<()> {
        let mut inner = self.inner.lock();
        let current = inner.map.get(key).map(|slot| slot.entry.clone());
        match transformer(current.as_ref()) {
            Some(next) => inner.store(key, next, self.max_entries),
            None => inner.drop_key(key),
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        for (_, slot) in inner.map.drain() {
            dispose_replaced(&slot.entry, None);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use std::sync::Arc;
    use std::time::SystemTime;

    fn entry(body: &str) -> CacheEntry {
        let now = SystemTime::now();
        CacheEntry::new(now, now, 200, None, Vec::new(), Some(Resource::from_bytes(body.to_string())), "GET")
    }

    #[tokio::test]
    async fn put_get_remove_round_trip() -> Result<()> {
        let storage = InMemoryStorage::new(10);
        storage.put("a", entry("one")).await?;
        assert!(storage.get("a").await?.is_some());
        storage.remove("a").await?;
        assert!(storage.get("a").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn replacement_disposes_the_superseded_resource() -> Result<()> {
        let storage = InMemoryStorage::new(10);
        let first = entry("one");
        let old_resource = first.resource().unwrap().clone();
        storage.put("a", first).await?;
        storage.put("a", entry("two")).await?;
        assert!(old_resource.is_disposed());
        Ok(())
    }

    #[tokio::test]
    async fn update_keeping_the_same_resource_does_not_dispose_it() -> Result<()> {
        let storage = InMemoryStorage::new(10);
        storage.put("a", entry("one")).await?;
        storage
            .update("a", &|old| old.map(|e| e.clone().with_error_count(e.error_count() + 1)))
            .await?;
        let updated = storage.get("a").await?.unwrap();
        assert_eq!(updated.error_count(), 1);
        assert!(!updated.resource().unwrap().is_disposed());
        Ok(())
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted_first() -> Result<()> {
        let storage = InMemoryStorage::new(2);
        storage.put("a", entry("a")).await?;
        storage.put("b", entry("b")).await?;
        // Touch "a" so "b" is the coldest.
        storage.get("a").await?;
        storage.put("c", entry("c")).await?;
        assert!(storage.get("a").await?.is_some());
        assert!(storage.get("b").await?.is_none());
        assert!(storage.get("c").await?.is_some());
        assert_eq!(storage.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn eviction_disposes_the_evicted_resource() -> Result<()> {
        let storage = InMemoryStorage::new(1);
        let first = entry("one");
        let resource = first.resource().unwrap().clone();
        storage.put("a", first).await?;
        storage.put("b", entry("two")).await?;
        assert!(resource.is_disposed());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_updates_on_one_key_all_land() -> Result<()> {
        let storage = Arc::new(InMemoryStorage::new(10));
        storage.put("a", entry("one")).await?;
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let storage = Arc::clone(&storage);
            tasks.push(tokio::spawn(async move {
                storage
                    .update("a", &|old| {
                        old.map(|e| e.clone().with_error_count(e.error_count() + 1))
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap()?;
        }
        assert_eq!(storage.get("a").await?.unwrap().error_count(), 32);
        Ok(())
    }

    #[tokio::test]
    async fn update_on_a_missing_key_can_insert() -> Result<()> {
        let storage = InMemoryStorage::new(10);
        storage
            .update("a", &|old| {
                assert!(old.is_none());
                Some(entry("fresh"))
            })
            .await?;
        assert!(storage.get("a").await?.is_some());
        Ok(())
    }
}
