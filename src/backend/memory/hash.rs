//! Hash-Table Store
//!
//! Per-key field maps with hash-level TTL, layered beside the primary store
//! in a disjoint namespace. Field values are stored in their tagged string
//! form (see [`crate::codec`]) so heterogeneous kinds survive the
//! string-only representation.
//!
//! Two maps are kept in lockstep: the hash map itself and an expiration
//! index consulted on every operation. A hash drained to zero fields is
//! removed from both. An index entry whose hash has gone missing is treated
//! as absent by readers and reclaimed by the sweep.

use std::collections::HashMap;
use std::time::Duration;

use super::entry::{current_timestamp_ms, deadline_ms};
use crate::codec;
use crate::error::{CacheError, Result};
use crate::value::{CacheValue, Ttl};

// == Hash Store ==
/// Hash-of-hashes store with independent per-key expiration.
#[derive(Debug)]
pub struct HashStore {
    /// key -> field -> tagged value
    hashes: HashMap<String, HashMap<String, String>>,
    /// Expiration index: key -> expiration instant (Unix milliseconds)
    deadlines: HashMap<String, u64>,
    /// TTL applied when a write passes `Ttl::Default`
    default_ttl: Option<Duration>,
}

impl HashStore {
    /// Creates an empty store with the given default hash TTL.
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            hashes: HashMap::new(),
            deadlines: HashMap::new(),
            default_ttl,
        }
    }

    /// True when the key has a deadline that has already passed.
    fn is_expired(&self, key: &str) -> bool {
        self.deadlines
            .get(key)
            .map(|deadline| current_timestamp_ms() >= *deadline)
            .unwrap_or(false)
    }

    /// Removes a hash and its index entry together.
    fn evict(&mut self, key: &str) {
        self.hashes.remove(key);
        self.deadlines.remove(key);
    }

    // == Set ==
    /// Encodes `fields` and merges them into the hash at `key`, creating it
    /// if absent. Fields already present but not named in this call are
    /// preserved. The TTL passed here replaces the hash's expiration.
    ///
    /// A hash whose TTL already lapsed is evicted first, so stale fields
    /// never leak into the new one.
    pub fn set(
        &mut self,
        key: &str,
        fields: HashMap<String, CacheValue>,
        ttl: Ttl,
    ) -> Result<()> {
        if fields.is_empty() {
            return Err(CacheError::InvalidArgument(format!(
                "no fields given for hash {}",
                key
            )));
        }

        if self.is_expired(key) {
            self.evict(key);
        }

        let mut encoded = HashMap::with_capacity(fields.len());
        for (field, value) in &fields {
            let tagged = codec::encode(value).map_err(|e| CacheError::UnsupportedType {
                field: field.clone(),
                reason: e.to_string(),
            })?;
            encoded.insert(field.clone(), tagged);
        }

        // Merge only after every field encoded, so a failed call leaves the
        // hash untouched.
        let hash = self.hashes.entry(key.to_string()).or_default();
        hash.extend(encoded);

        match deadline_ms(ttl.resolve(self.default_ttl)) {
            Some(deadline) => {
                self.deadlines.insert(key.to_string(), deadline);
            }
            None => {
                self.deadlines.remove(key);
            }
        }

        Ok(())
    }

    // == Get All ==
    /// Retrieves every field of the hash at `key`, decoded.
    ///
    /// A lapsed TTL is detected here and the hash evicted as a side effect
    /// of the read.
    pub fn get_all(&mut self, key: &str) -> Result<HashMap<String, CacheValue>> {
        if self.is_expired(key) {
            self.evict(key);
            return Err(CacheError::Expired(key.to_string()));
        }

        let hash = self
            .hashes
            .get(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        let mut result = HashMap::with_capacity(hash.len());
        for (field, tagged) in hash {
            result.insert(field.clone(), codec::decode(tagged));
        }
        Ok(result)
    }

    // == Get Field ==
    /// Retrieves one field of the hash at `key`, decoded.
    pub fn get_field(&self, key: &str, field: &str) -> Result<CacheValue> {
        if self.is_expired(key) {
            return Err(CacheError::Expired(key.to_string()));
        }

        let hash = self
            .hashes
            .get(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        let tagged = hash.get(field).ok_or_else(|| CacheError::FieldNotFound {
            key: key.to_string(),
            field: field.to_string(),
        })?;

        Ok(codec::decode(tagged))
    }

    // == Exists Field ==
    /// Reports whether the hash at `key` contains `field`.
    ///
    /// A missing key is `false`, not an error; a lapsed TTL is an error.
    pub fn exists_field(&self, key: &str, field: &str) -> Result<bool> {
        if self.is_expired(key) {
            return Err(CacheError::Expired(key.to_string()));
        }

        match self.hashes.get(key) {
            Some(hash) => Ok(hash.contains_key(field)),
            None => Ok(false),
        }
    }

    // == Delete Field ==
    /// Removes one field. Draining the hash to zero fields removes the hash
    /// and its index entry together.
    pub fn delete_field(&mut self, key: &str, field: &str) -> Result<()> {
        let hash = self
            .hashes
            .get_mut(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        if hash.remove(field).is_none() {
            return Err(CacheError::FieldNotFound {
                key: key.to_string(),
                field: field.to_string(),
            });
        }

        if hash.is_empty() {
            self.evict(key);
        }

        Ok(())
    }

    // == Expire ==
    /// Replaces the expiration of the hash at `key`. `Ttl::Never` clears
    /// it; `Ttl::Default` applies the store's default hash TTL.
    pub fn expire(&mut self, key: &str, ttl: Ttl) -> Result<()> {
        if self.is_expired(key) {
            self.evict(key);
            return Err(CacheError::Expired(key.to_string()));
        }

        if !self.hashes.contains_key(key) {
            return Err(CacheError::NotFound(key.to_string()));
        }

        match deadline_ms(ttl.resolve(self.default_ttl)) {
            Some(deadline) => {
                self.deadlines.insert(key.to_string(), deadline);
            }
            None => {
                self.deadlines.remove(key);
            }
        }

        Ok(())
    }

    // == Cleanup Expired ==
    /// Scans the expiration index and evicts every hash whose instant has
    /// passed, returning how many were removed. Orphaned index entries are
    /// reclaimed the same way.
    pub fn sweep_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.evict(&key);
        }
        count
    }

    // == Introspection ==
    /// Number of hashes physically present.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Number of entries in the expiration index.
    pub fn index_len(&self) -> usize {
        self.deadlines.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn fields(pairs: &[(&str, CacheValue)]) -> HashMap<String, CacheValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn store() -> HashStore {
        HashStore::new(None)
    }

    #[test]
    fn test_set_and_get_all_preserves_kinds() {
        let mut hs = store();
        hs.set(
            "user:1",
            fields(&[
                ("name", CacheValue::from("zhangsan")),
                ("age", CacheValue::from(30i64)),
                ("active", CacheValue::from(true)),
                ("balance", CacheValue::from(100.5f64)),
            ]),
            Ttl::Never,
        )
        .unwrap();

        let all = hs.get_all("user:1").unwrap();
        assert_eq!(all.get("name"), Some(&CacheValue::from("zhangsan")));
        assert_eq!(all.get("age"), Some(&CacheValue::from(30i64)));
        assert_eq!(all.get("active"), Some(&CacheValue::from(true)));
        assert_eq!(all.get("balance"), Some(&CacheValue::from(100.5f64)));
    }

    #[test]
    fn test_set_merges_additively() {
        let mut hs = store();
        hs.set("h", fields(&[("a", CacheValue::from(1i64))]), Ttl::Never)
            .unwrap();
        hs.set("h", fields(&[("b", CacheValue::from(2i64))]), Ttl::Never)
            .unwrap();

        let all = hs.get_all("h").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("a"), Some(&CacheValue::from(1i64)));
        assert_eq!(all.get("b"), Some(&CacheValue::from(2i64)));
    }

    #[test]
    fn test_set_empty_fields_rejected() {
        let mut hs = store();
        let result = hs.set("h", HashMap::new(), Ttl::Never);
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
        assert_eq!(hs.len(), 0);
    }

    #[test]
    fn test_get_all_absent_is_not_found() {
        let mut hs = store();
        assert!(matches!(
            hs.get_all("missing"),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_get_all_expired_is_expired_and_evicts() {
        let mut hs = store();
        hs.set(
            "h",
            fields(&[("a", CacheValue::from(1i64))]),
            Ttl::After(Duration::from_millis(30)),
        )
        .unwrap();

        sleep(Duration::from_millis(60));

        assert!(matches!(hs.get_all("h"), Err(CacheError::Expired(_))));
        // Evicted as a side effect: both maps drop the key.
        assert_eq!(hs.len(), 0);
        assert_eq!(hs.index_len(), 0);
        // A second read now reports plain absence.
        assert!(matches!(hs.get_all("h"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_get_field() {
        let mut hs = store();
        hs.set(
            "h",
            fields(&[("email", CacheValue::from("a@b.c"))]),
            Ttl::Never,
        )
        .unwrap();

        assert_eq!(
            hs.get_field("h", "email").unwrap(),
            CacheValue::from("a@b.c")
        );
        assert!(matches!(
            hs.get_field("h", "phone"),
            Err(CacheError::FieldNotFound { .. })
        ));
        assert!(matches!(
            hs.get_field("missing", "email"),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_exists_field() {
        let mut hs = store();
        hs.set("h", fields(&[("a", CacheValue::from(1i64))]), Ttl::Never)
            .unwrap();

        assert!(hs.exists_field("h", "a").unwrap());
        assert!(!hs.exists_field("h", "b").unwrap());
        // Missing key is false, not an error.
        assert!(!hs.exists_field("missing", "a").unwrap());
    }

    #[test]
    fn test_exists_field_expired_is_error() {
        let mut hs = store();
        hs.set(
            "h",
            fields(&[("a", CacheValue::from(1i64))]),
            Ttl::After(Duration::from_millis(30)),
        )
        .unwrap();

        sleep(Duration::from_millis(60));
        assert!(matches!(
            hs.exists_field("h", "a"),
            Err(CacheError::Expired(_))
        ));
    }

    #[test]
    fn test_delete_field_drains_hash() {
        let mut hs = store();
        hs.set(
            "h",
            fields(&[
                ("a", CacheValue::from(1i64)),
                ("b", CacheValue::from(2i64)),
            ]),
            Ttl::seconds(60),
        )
        .unwrap();

        hs.delete_field("h", "a").unwrap();
        hs.delete_field("h", "b").unwrap();

        // Zero fields means the hash is gone from both maps.
        assert_eq!(hs.len(), 0);
        assert_eq!(hs.index_len(), 0);
        assert!(matches!(hs.get_all("h"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_delete_field_errors() {
        let mut hs = store();
        assert!(matches!(
            hs.delete_field("missing", "a"),
            Err(CacheError::NotFound(_))
        ));

        hs.set("h", fields(&[("a", CacheValue::from(1i64))]), Ttl::Never)
            .unwrap();
        assert!(matches!(
            hs.delete_field("h", "b"),
            Err(CacheError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_expire_replaces_and_clears() {
        let mut hs = store();
        hs.set("h", fields(&[("a", CacheValue::from(1i64))]), Ttl::Never)
            .unwrap();
        assert_eq!(hs.index_len(), 0);

        hs.expire("h", Ttl::seconds(60)).unwrap();
        assert_eq!(hs.index_len(), 1);

        hs.expire("h", Ttl::Never).unwrap();
        assert_eq!(hs.index_len(), 0);

        assert!(matches!(
            hs.expire("missing", Ttl::seconds(60)),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_set_after_expiry_does_not_resurrect_stale_fields() {
        let mut hs = store();
        hs.set(
            "h",
            fields(&[("stale", CacheValue::from(1i64))]),
            Ttl::After(Duration::from_millis(30)),
        )
        .unwrap();

        sleep(Duration::from_millis(60));

        hs.set("h", fields(&[("fresh", CacheValue::from(2i64))]), Ttl::Never)
            .unwrap();

        let all = hs.get_all("h").unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("fresh"));
    }

    #[test]
    fn test_sweep_expired() {
        let mut hs = store();
        hs.set(
            "short",
            fields(&[("a", CacheValue::from(1i64))]),
            Ttl::After(Duration::from_millis(30)),
        )
        .unwrap();
        hs.set(
            "long",
            fields(&[("a", CacheValue::from(1i64))]),
            Ttl::seconds(60),
        )
        .unwrap();

        sleep(Duration::from_millis(60));

        let removed = hs.sweep_expired();
        assert_eq!(removed, 1);
        assert_eq!(hs.len(), 1);
        assert_eq!(hs.index_len(), 1);
        assert!(hs.get_all("long").is_ok());
    }

    #[test]
    fn test_sweep_reclaims_orphaned_index_entries() {
        let mut hs = store();
        hs.set(
            "h",
            fields(&[("a", CacheValue::from(1i64))]),
            Ttl::After(Duration::from_millis(30)),
        )
        .unwrap();
        // Simulate an index entry whose hash vanished.
        hs.hashes.remove("h");

        // Readers treat the dangling index entry as plain absence.
        assert!(matches!(hs.get_all("h"), Err(CacheError::NotFound(_))));
        sleep(Duration::from_millis(60));
        hs.sweep_expired();
        assert_eq!(hs.index_len(), 0);
    }
}
