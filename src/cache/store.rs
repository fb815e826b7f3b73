//! Cache Store Module
//!
//! Core cache engine combining HashMap storage with millisecond-resolution
//! TTL expiry and a tag index for group invalidation.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{estimate_size, string_size, CacheEntry, CacheStats, MemoryUsage, TagIndex};

// == Cache Store ==
/// In-memory key/value store with per-entry expiry.
///
/// Expired entries are removed lazily when read, or in bulk by
/// [`cleanup_expired`](CacheStore::cleanup_expired). The tag index is
/// maintained separately from the entries: plain `set`/`delete`/`clear`
/// never touch it, only `set_with_tags` adds to it and
/// `invalidate_by_tags` consumes from it. A tag set may therefore name
/// keys that have already expired or been deleted; invalidation treats
/// those as no-ops.
///
/// Callers choose collision-free keys; the store enforces no namespacing.
/// The convention in this codebase is hierarchical colon-delimited keys
/// encoding resource type, identifier and variant (`study:123:report`),
/// with tags as logical invalidation scopes (`patient:42`).
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage with expiry metadata
    entries: HashMap<String, CacheEntry<V>>,
    /// Tag -> key-set index for group invalidation
    tags: TagIndex,
    /// TTL in seconds applied when a caller omits one
    default_ttl: u64,
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates a new empty CacheStore.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL in seconds for entries stored without an
    ///   explicit TTL
    pub fn new(default_ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            tags: TagIndex::new(),
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a key-value pair with optional per-entry TTL.
    ///
    /// If the key already exists, the value is overwritten unconditionally
    /// and the deadline restarts from now using the new TTL. Existing tag
    /// associations for the key are left as they are; tag bookkeeping
    /// happens only through [`set_with_tags`](CacheStore::set_with_tags).
    pub fn set(&mut self, key: String, value: V, ttl: Option<u64>) {
        let effective_ttl = ttl.unwrap_or(self.default_ttl);

        debug!("Cache SET: {} (expires in {}s)", key, effective_ttl);
        self.entries.insert(key, CacheEntry::new(value, effective_ttl));
    }

    // == Has ==
    /// Checks whether a key is present and live.
    ///
    /// Applies the same lazy expiry as `get`: an expired entry is removed
    /// as a side effect and reported as absent.
    pub fn has(&mut self, key: &str) -> bool {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                self.entries.remove(key);
                debug!("Cache EXPIRED: {}", key);
                return false;
            }
            true
        } else {
            false
        }
    }

    // == Delete ==
    /// Removes an entry by key, returning whether it existed.
    ///
    /// Deleting an absent key is a normal no-op. The tag index is not
    /// updated; stale tag members are tolerated by invalidation.
    pub fn delete(&mut self, key: &str) -> bool {
        let existed = self.entries.remove(key).is_some();

        if existed {
            debug!("Cache DELETE: {}", key);
        }

        existed
    }

    /// Alias for [`delete`](CacheStore::delete).
    pub fn del(&mut self, key: &str) -> bool {
        self.delete(key)
    }

    // == Clear ==
    /// Removes every entry from the store.
    ///
    /// The tag index is left untouched, so tags applied before a clear
    /// still target their keys if those keys are later re-inserted.
    pub fn clear(&mut self) {
        let size = self.entries.len();
        self.entries.clear();
        info!("Cache CLEARED: {} entries removed", size);
    }

    // == Length ==
    /// Returns the number of entries physically held.
    ///
    /// May include expired entries that have not been swept yet; callers
    /// needing exactness should run
    /// [`cleanup_expired`](CacheStore::cleanup_expired) first.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Keys ==
    /// Returns all stored keys, expired-but-unswept ones included.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Cleanup Expired ==
    /// Removes every entry whose deadline has passed.
    ///
    /// This is the only mechanism that reclaims memory for entries nobody
    /// reads after they expire; lazy expiry alone would leak entries that
    /// are set and forgotten. Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let before = self.entries.len();

        self.entries.retain(|_, entry| !entry.is_expired_at(now));

        before - self.entries.len()
    }

    // == Set With Tags ==
    /// Stores a key-value pair and associates the key with each tag.
    ///
    /// Behaves exactly like [`set`](CacheStore::set), then records the key
    /// under every tag so the whole group can later be dropped with one
    /// [`invalidate_by_tags`](CacheStore::invalidate_by_tags) call.
    pub fn set_with_tags(&mut self, key: String, value: V, tags: &[&str], ttl: Option<u64>) {
        self.tags.tag_key(&key, tags);
        self.set(key, value, ttl);
    }

    // == Invalidate By Tags ==
    /// Deletes every entry associated with any of the given tags.
    ///
    /// The named tag entries are consumed from the index entirely, their
    /// member keys deduplicated, and each key deleted through the ordinary
    /// delete path. Returns how many deletions removed a present key;
    /// already-expired-and-swept or already-deleted members count as
    /// no-ops. Unknown tags are skipped.
    pub fn invalidate_by_tags(&mut self, tags: &[&str]) -> usize {
        let keys = self.tags.take(tags);

        let mut invalidated = 0;
        for key in &keys {
            if self.delete(key) {
                invalidated += 1;
            }
        }

        info!(
            "Cache invalidated by tags [{}]: {} entries",
            tags.join(", "),
            invalidated
        );
        invalidated
    }
}

impl<V: Clone> CacheStore<V> {
    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns `None` for an absent key or one whose TTL has elapsed; in
    /// the latter case the entry is deleted before returning ("lazy expiry
    /// on read"). A miss is a normal result, not an error.
    pub fn get(&mut self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            // Check if expired
            if entry.is_expired() {
                self.entries.remove(key);
                debug!("Cache EXPIRED: {}", key);
                return None;
            }

            debug!("Cache HIT: {}", key);
            Some(entry.value.clone())
        } else {
            debug!("Cache MISS: {}", key);
            None
        }
    }
}

impl<V: Serialize> CacheStore<V> {
    // == Stats ==
    /// Takes a snapshot of cache state without mutating it.
    ///
    /// Walks the entries once, partitioning them by expiry against a
    /// single "now", and sums an estimated byte size for every key and
    /// value.
    pub fn stats(&self) -> CacheStats {
        let now = current_timestamp_ms();
        let mut valid_entries = 0;
        let mut expired_entries = 0;
        let mut bytes = 0;

        for (key, entry) in &self.entries {
            if entry.is_expired_at(now) {
                expired_entries += 1;
            } else {
                valid_entries += 1;
            }
            bytes += string_size(key) + estimate_size(&entry.value);
        }

        CacheStats {
            total_entries: self.entries.len(),
            valid_entries,
            expired_entries,
            memory_usage: MemoryUsage::from_bytes(bytes),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_store_new() {
        let store: CacheStore<String> = CacheStore::new(300);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new(300);

        store.set("key1".to_string(), "value1".to_string(), None);
        let value = store.get("key1");

        assert_eq!(value, Some("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store: CacheStore<String> = CacheStore::new(300);

        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_has() {
        let mut store = CacheStore::new(300);

        store.set("key1".to_string(), "value1".to_string(), None);

        assert!(store.has("key1"));
        assert!(!store.has("nonexistent"));
    }

    #[test]
    fn test_store_delete() {
        let mut store = CacheStore::new(300);

        store.set("key1".to_string(), "value1".to_string(), None);

        assert!(store.delete("key1"));
        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_delete_nonexistent() {
        let mut store: CacheStore<String> = CacheStore::new(300);

        assert!(!store.delete("nonexistent"));
    }

    #[test]
    fn test_store_del_alias() {
        let mut store = CacheStore::new(300);

        store.set("key1".to_string(), "value1".to_string(), None);
        assert!(store.del("key1"));
        assert!(!store.del("key1"));
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new(300);

        store.set("key1".to_string(), "value1".to_string(), None);
        store.set("key1".to_string(), "value2".to_string(), None);

        assert_eq!(store.get("key1"), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_overwrite_resets_ttl() {
        let mut store = CacheStore::new(300);

        // First insert would expire after 1s, the overwrite extends it
        store.set("key1".to_string(), "value1".to_string(), Some(1));
        store.set("key1".to_string(), "value2".to_string(), Some(10));

        sleep(Duration::from_millis(1100));

        assert_eq!(store.get("key1"), Some("value2".to_string()));
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(300);

        store.set("key1".to_string(), "value1".to_string(), Some(1));

        // Accessible immediately
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(1100));

        assert_eq!(store.get("key1"), None);
        assert!(!store.has("key1"));
    }

    #[test]
    fn test_store_lazy_removal_on_read() {
        let mut store = CacheStore::new(300);

        store.set("key1".to_string(), "value1".to_string(), Some(1));
        store.set("key2".to_string(), "value2".to_string(), Some(60));

        sleep(Duration::from_millis(1100));

        // Expired entry still physically present until read
        assert_eq!(store.len(), 2);
        assert!(store.keys().contains(&"key1".to_string()));

        assert_eq!(store.get("key1"), None);

        // The read removed exactly that entry
        assert_eq!(store.len(), 1);
        assert!(!store.keys().contains(&"key1".to_string()));
    }

    #[test]
    fn test_store_default_ttl_applied() {
        let mut store = CacheStore::new(1);

        store.set("key1".to_string(), "value1".to_string(), None);

        sleep(Duration::from_millis(1100));

        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_clear() {
        let mut store = CacheStore::new(300);

        store.set("key1".to_string(), "value1".to_string(), None);
        store.set("key2".to_string(), "value2".to_string(), None);

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_clear_leaves_tag_index() {
        let mut store = CacheStore::new(300);

        store.set_with_tags("key1".to_string(), "value1".to_string(), &["t"], None);
        store.clear();

        // The stale tag entry still targets key1: re-inserting the key
        // makes it reachable through the old tag again.
        store.set("key1".to_string(), "value2".to_string(), None);

        assert_eq!(store.invalidate_by_tags(&["t"]), 1);
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = CacheStore::new(300);

        store.set("key1".to_string(), "value1".to_string(), Some(1));
        store.set("key2".to_string(), "value2".to_string(), Some(10));

        sleep(Duration::from_millis(1100));

        let removed = store.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("key2").is_some());
    }

    #[test]
    fn test_store_tag_invalidation() {
        let mut store = CacheStore::new(300);

        store.set_with_tags("a".to_string(), "va".to_string(), &["T"], None);
        store.set_with_tags("b".to_string(), "vb".to_string(), &["T"], None);
        store.set_with_tags("c".to_string(), "vc".to_string(), &["U"], None);

        assert_eq!(store.invalidate_by_tags(&["T"]), 2);

        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), None);
        assert_eq!(store.get("c"), Some("vc".to_string()));
    }

    #[test]
    fn test_store_tag_invalidation_idempotent() {
        let mut store = CacheStore::new(300);

        store.set_with_tags("a".to_string(), "va".to_string(), &["T"], None);

        assert_eq!(store.invalidate_by_tags(&["T"]), 1);
        assert_eq!(store.invalidate_by_tags(&["T"]), 0);
    }

    #[test]
    fn test_store_tag_invalidation_tolerates_expired_members() {
        let mut store = CacheStore::new(300);

        store.set_with_tags("a".to_string(), "va".to_string(), &["T"], Some(1));
        store.set_with_tags("b".to_string(), "vb".to_string(), &["T"], Some(60));

        sleep(Duration::from_millis(1100));

        // "a" expired and was swept; only "b" is actually removed
        store.cleanup_expired();
        assert_eq!(store.invalidate_by_tags(&["T"]), 1);
    }

    #[test]
    fn test_store_plain_delete_leaves_tags() {
        let mut store = CacheStore::new(300);

        store.set_with_tags("a".to_string(), "va".to_string(), &["T"], None);
        store.delete("a");

        // Index still holds the member; invalidation tolerates the
        // absent key and reports zero removals.
        assert_eq!(store.invalidate_by_tags(&["T"]), 0);
    }

    #[test]
    fn test_store_multi_tag_key_counted_once() {
        let mut store = CacheStore::new(300);

        store.set_with_tags("a".to_string(), "va".to_string(), &["T", "U"], None);

        assert_eq!(store.invalidate_by_tags(&["T", "U"]), 1);
    }

    #[test]
    fn test_store_stats_partition() {
        let mut store = CacheStore::new(300);

        store.set("key1".to_string(), "value1".to_string(), Some(1));
        store.set("key2".to_string(), "value2".to_string(), Some(60));

        let stats = store.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 2);
        assert_eq!(stats.expired_entries, 0);

        sleep(Duration::from_millis(1100));

        // Stats report the expired entry without removing it
        let stats = store.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 1);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_store_stats_memory_usage() {
        let mut store = CacheStore::new(300);

        store.set("key".to_string(), "value".to_string(), None);

        let stats = store.stats();
        // "key" = 6 bytes, "value" = 10 bytes
        assert_eq!(stats.memory_usage.bytes, 16);
    }

    #[test]
    fn test_store_json_values() {
        use serde_json::json;

        let mut store = CacheStore::new(300);

        store.set(
            "study:1".to_string(),
            json!({"uid": "1.2.3", "series": 4}),
            None,
        );

        let value = store.get("study:1").unwrap();
        assert_eq!(value["uid"], "1.2.3");
        assert!(store.stats().memory_usage.bytes > 0);
    }
}
