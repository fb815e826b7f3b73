//! Tag Index Module
//!
//! Maps invalidation tags to the set of cache keys inserted under them.

use std::collections::{HashMap, HashSet};

// == Tag Index ==
/// Reverse index from tag to tagged cache keys.
///
/// Membership is best-effort: plain deletes and TTL expiry never prune the
/// index, so a tag set may reference keys that are already gone. Consumers
/// must tolerate deleting absent keys. A tag entry is removed only when it
/// is consumed by [`take`](TagIndex::take).
#[derive(Debug, Default)]
pub struct TagIndex {
    /// Keys currently associated with each tag
    members: HashMap<String, HashSet<String>>,
}

impl TagIndex {
    // == Constructor ==
    /// Creates a new empty tag index.
    pub fn new() -> Self {
        Self {
            members: HashMap::new(),
        }
    }

    // == Tag Key ==
    /// Associates a key with each of the given tags.
    ///
    /// Tag sets are created on first use. A key may appear under any
    /// number of tags simultaneously.
    pub fn tag_key(&mut self, key: &str, tags: &[&str]) {
        for tag in tags {
            self.members
                .entry((*tag).to_string())
                .or_default()
                .insert(key.to_string());
        }
    }

    // == Take ==
    /// Consumes the given tags, returning the deduplicated union of their
    /// member keys.
    ///
    /// Each named tag entry is removed from the index entirely; unknown
    /// tags are skipped.
    pub fn take(&mut self, tags: &[&str]) -> HashSet<String> {
        let mut keys = HashSet::new();

        for tag in tags {
            if let Some(members) = self.members.remove(*tag) {
                keys.extend(members);
            }
        }

        keys
    }

    // == Length ==
    /// Returns the number of tags currently indexed.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    // == Contains ==
    /// Checks whether a tag has an entry in the index.
    #[allow(dead_code)]
    pub fn contains(&self, tag: &str) -> bool {
        self.members.contains_key(tag)
    }
}
