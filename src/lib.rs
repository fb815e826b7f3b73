//! RIS Cache - an in-memory TTL cache with tag-based invalidation
//!
//! Memoizes data fetched from the PACS and object-storage backends for a
//! bounded time. Entries expire per-key, are swept lazily on read and
//! periodically in the background, and can be dropped as a group through
//! invalidation tags. A cache-aside helper turns "check cache, else fetch
//! and populate" into one call.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStats, CacheStore, TtlCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
