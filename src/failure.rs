use std::time::SystemTime;

use dashmap::DashMap;

/// Bounded, approximate map of consecutive failure counts per identifier.
///
/// Counts saturate instead of wrapping. When an increment pushes the map
/// over its bound, the record with the oldest creation instant is evicted;
/// at the default bound of 1000 a full scan is cheap enough.
#[derive(Debug)]
pub struct FailureCache {
    map: DashMap<String, FailureRecord>,
    max_entries: usize,
}

#[derive(Debug, Clone, Copy)]
struct FailureRecord {
    count: u32,
    created: SystemTime,
}

impl FailureCache {
    /// A cache tracking at most `max_entries` identifiers.
    pub fn new(max_entries: usize) -> Self {
        Self { map: DashMap::new(), max_entries: max_entries.max(1) }
    }

    /// Consecutive failures recorded for `identifier`; zero when unknown.
    pub fn error_count(&self, identifier: &str) -> u32 {
        self.map.get(identifier).map_or(0, |record| record.count)
    }

    /// Forgets `identifier` after a success.
    pub fn reset(&self, identifier: &str) {
        self.map.remove(identifier);
    }

    /// Records one more failure for `identifier`.
    pub fn increment(&self, identifier: &str) {
        self.map
            .entry(identifier.to_string())
            .and_modify(|record| record.count = record.count.saturating_add(1))
            .or_insert(FailureRecord { count: 1, created: SystemTime::now() });
        while self.map.len() > self.max_entries {
            let oldest = self
                .map
                .iter()
                .min_by_key(|record| record.value().created)
                .map(|record| record.key().clone());
            match oldest {
                Some(key) => {
                    self.map.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Number of tracked identifiers.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` when no failures are tracked.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_and_reset() {
        let cache = FailureCache::new(10);
        assert_eq!(cache.error_count("a"), 0);
        cache.increment("a");
        cache.increment("a");
        assert_eq!(cache.error_count("a"), 2);
        cache.reset("a");
        assert_eq!(cache.error_count("a"), 0);
    }

    #[test]
    fn size_never_exceeds_the_bound() {
        let cache = FailureCache::new(5);
        for i in 0..50 {
            cache.increment(&format!("id-{i}"));
            assert!(cache.len() <= 5);
        }
    }

    #[test]
    fn overflow_evicts_the_oldest_record() {
        let cache = FailureCache::new(2);
        cache.increment("first");
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.increment("second");
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.increment("third");
        assert_eq!(cache.error_count("first"), 0);
        assert_eq!(cache.error_count("second"), 1);
        assert_eq!(cache.error_count("third"), 1);
    }

    #[test]
    fn counts_saturate_at_the_ceiling() {
        let cache = FailureCache::new(2);
        cache.increment("a");
        cache.map.get_mut("a").unwrap().count = u32::MAX;
        cache.increment("a");
        assert_eq!(cache.error_count("a"), u32::MAX);
    }
}
