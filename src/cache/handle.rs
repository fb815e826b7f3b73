//! Shared Cache Handle
//!
//! Async facade over [`CacheStore`] for use from request handlers: wraps
//! the store in `Arc<RwLock<...>>`, owns the background sweep task, and
//! provides the cache-aside `get_or_set` helper.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{CacheStats, CacheStore};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_cleanup_task;

// == TTL Cache ==
/// Process-wide cache handle.
///
/// Constructed once by the composition root and shared with handlers
/// (typically behind an `Arc`); tests construct their own instances. The
/// periodic sweep task is spawned on construction and aborted when the
/// handle is dropped, so short-lived instances do not leak timers.
///
/// All methods lock internally. `get`/`has` take the write lock because
/// lazy expiry may delete the entry being read.
#[derive(Debug)]
pub struct TtlCache<V> {
    /// Thread-safe cache store
    store: Arc<RwLock<CacheStore<V>>>,
    /// Periodic sweep task, aborted on drop
    cleanup_task: JoinHandle<()>,
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache and starts its background sweep.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &Config) -> Self {
        let store = Arc::new(RwLock::new(CacheStore::new(config.default_ttl)));
        let cleanup_task = spawn_cleanup_task(store.clone(), config.cleanup_interval);

        Self {
            store,
            cleanup_task,
        }
    }

    // == Set ==
    /// Stores a value under `key`, overwriting any previous entry.
    pub async fn set(&self, key: String, value: V, ttl: Option<u64>) {
        self.store.write().await.set(key, value, ttl);
    }

    // == Get ==
    /// Returns the live value for `key`, or `None` if absent or expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.store.write().await.get(key)
    }

    // == Has ==
    /// Existence probe with the same lazy expiry as `get`.
    pub async fn has(&self, key: &str) -> bool {
        self.store.write().await.has(key)
    }

    // == Delete ==
    /// Removes `key`, returning whether it existed.
    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    /// Alias for [`delete`](TtlCache::delete).
    pub async fn del(&self, key: &str) -> bool {
        self.store.write().await.del(key)
    }

    // == Clear ==
    /// Removes every entry (the tag index is left untouched).
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    // == Length ==
    /// Entry count, expired-but-unswept entries included.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    // == Keys ==
    pub async fn keys(&self) -> Vec<String> {
        self.store.read().await.keys()
    }

    // == Stats ==
    /// Snapshot of valid/expired counts and estimated memory usage.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    // == Cleanup ==
    /// Runs a sweep immediately instead of waiting for the timer.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    // == Set With Tags ==
    /// Stores a value and associates the key with invalidation tags.
    pub async fn set_with_tags(&self, key: String, value: V, tags: &[&str], ttl: Option<u64>) {
        self.store.write().await.set_with_tags(key, value, tags, ttl);
    }

    // == Invalidate By Tags ==
    /// Deletes every entry tagged with any of `tags`; returns how many
    /// entries were actually removed.
    pub async fn invalidate_by_tags(&self, tags: &[&str]) -> usize {
        self.store.write().await.invalidate_by_tags(tags)
    }

    // == Get Or Set ==
    /// Cache-aside read: returns the cached value for `key`, or runs
    /// `fetch`, stores its result under `key` and returns it.
    ///
    /// A failed fetch is forwarded as [`CacheError::Fetch`] with the
    /// original error as its source, and nothing is cached, so the next
    /// call fetches again.
    ///
    /// The lock is not held while the fetch is pending: two concurrent
    /// callers missing on the same key both invoke their fetch, and a
    /// concurrent `set` on the key can complete in the meantime. The
    /// later write wins. Fetches are expected to be idempotent, which
    /// makes the duplicated upstream call a performance concern only.
    pub async fn get_or_set<F, Fut>(&self, key: &str, ttl: Option<u64>, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        debug!("Cache FETCH: {}", key);
        match fetch().await {
            Ok(value) => {
                self.set(key.to_string(), value.clone(), ttl).await;
                Ok(value)
            }
            Err(source) => Err(CacheError::Fetch {
                key: key.to_string(),
                source,
            }),
        }
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        self.cleanup_task.abort();
    }
}
