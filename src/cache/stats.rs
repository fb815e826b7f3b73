//! Cache Statistics Module
//!
//! Point-in-time snapshots of cache health: valid vs expired entry counts
//! and a rough memory footprint estimate.

use serde::Serialize;
use serde_json::Value;

// == Cache Stats ==
/// Snapshot of cache state taken by a single non-mutating pass.
///
/// `expired_entries` counts entries whose TTL has elapsed but which have
/// not been swept yet; they still occupy memory until the next cleanup or
/// until a read lazily removes them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of entries physically held, expired or not
    pub total_entries: usize,
    /// Entries whose deadline is still in the future
    pub valid_entries: usize,
    /// Entries past their deadline, awaiting sweep
    pub expired_entries: usize,
    /// Estimated memory footprint of keys and values
    pub memory_usage: MemoryUsage,
}

// == Memory Usage ==
/// Best-effort byte estimate, diagnostic only.
///
/// Never used for eviction decisions; eviction is purely TTL-driven.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryUsage {
    pub bytes: usize,
    pub kb: usize,
    pub mb: usize,
}

impl MemoryUsage {
    /// Derives rounded KB/MB figures from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self {
            bytes,
            kb: (bytes as f64 / 1024.0).round() as usize,
            mb: (bytes as f64 / (1024.0 * 1024.0)).round() as usize,
        }
    }
}

// == Size Estimation ==
/// Estimates the in-memory size of a serializable value in bytes.
///
/// The value is projected to JSON and walked recursively: strings count
/// two bytes per UTF-16 code unit, numbers eight bytes, booleans four,
/// containers the sum of their children. Values that cannot be projected
/// count as zero.
pub fn estimate_size<V: Serialize>(value: &V) -> usize {
    match serde_json::to_value(value) {
        Ok(json) => estimate_json_size(&json),
        Err(_) => 0,
    }
}

/// Estimates the size of a string in bytes (UTF-16 code units x 2).
pub fn string_size(s: &str) -> usize {
    s.encode_utf16().count() * 2
}

fn estimate_json_size(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 4,
        Value::Number(_) => 8,
        Value::String(s) => string_size(s),
        Value::Array(items) => items.iter().map(estimate_json_size).sum(),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| string_size(key) + estimate_json_size(item))
            .sum(),
    }
}
