//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.
//!
//! Cache misses, unknown tags and double deletes are normal empty results,
//! not errors; the only failure surface is a fetch callback failing inside
//! `get_or_set`.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The fetch callback passed to `get_or_set` failed.
    ///
    /// The callback's error is carried unmodified as the source; nothing
    /// is cached for the key, so the next lookup fetches again.
    #[error("fetch for key '{key}' failed")]
    Fetch {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
