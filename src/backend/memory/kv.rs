//! Primary Key-Value Store
//!
//! Capacity-unbounded key-value storage with per-entry TTL. Expired entries
//! are treated as absent by every read; physical removal happens in
//! [`KvStore::sweep_expired`], driven by the background cleanup task.

use std::collections::HashMap;
use std::time::Duration;

use super::entry::Entry;
use crate::value::{CacheValue, Ttl};

// == KV Store ==
/// Primary store: string key to value, each entry with its own expiry.
#[derive(Debug)]
pub struct KvStore {
    /// Key-value storage
    entries: HashMap<String, Entry>,
    /// TTL applied when a write passes `Ttl::Default`
    default_ttl: Option<Duration>,
}

impl KvStore {
    /// Creates an empty store with the given default TTL.
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a key-value pair, unconditionally overwriting any existing
    /// entry and resetting its TTL (last-write-wins).
    pub fn set(&mut self, key: String, value: CacheValue, ttl: Ttl) {
        let entry = Entry::new(value, ttl.resolve(self.default_ttl));
        self.entries.insert(key, entry);
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns `None` for keys that were never set, were deleted, or whose
    /// expiration instant has passed. The expired entry itself is left in
    /// place for the sweep to reclaim.
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    // == Exists ==
    /// Same liveness rule as `get`, without cloning the value.
    pub fn exists(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    // == Delete ==
    /// Removes an entry. Deleting an absent key is a no-op.
    pub fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }

    // == Batch Operations ==
    /// Stores every pair in `entries` with the same TTL.
    pub fn mset(&mut self, entries: HashMap<String, CacheValue>, ttl: Ttl) {
        let resolved = ttl.resolve(self.default_ttl);
        for (key, value) in entries {
            self.entries.insert(key, Entry::new(value, resolved));
        }
    }

    /// Retrieves the live subset of `keys`. Absent and expired keys are
    /// omitted from the result.
    pub fn mget(&self, keys: &[&str]) -> HashMap<String, CacheValue> {
        let mut result = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(key) {
                result.insert((*key).to_string(), value);
            }
        }
        result
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub fn sweep_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.entries.remove(&key);
        }
        count
    }

    // == Length ==
    /// Current number of physically present entries (expired included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
