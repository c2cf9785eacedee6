//! Memory Backend
//!
//! In-process implementation of the cache contract: a primary key-value
//! store and a hash-table store behind one reader/writer lock, plus a
//! background task sweeping expired entries out of both.

mod entry;
mod hash;
mod kv;

pub use entry::Entry;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_cleanup_task;
use crate::value::{CacheValue, Ttl};

use super::Cache;
use hash::HashStore;
use kv::KvStore;

// == Shared State ==
/// Both stores, guarded together by one lock.
///
/// Every public operation takes the lock in the mode it needs for its full
/// critical section, so a hash merge is atomic relative to concurrent hash
/// reads and the sweep never observes half a write.
pub(crate) struct MemoryStores {
    pub(crate) kv: KvStore,
    pub(crate) hashes: HashStore,
}

impl MemoryStores {
    fn from_config(config: &CacheConfig) -> Self {
        Self {
            kv: KvStore::new(config.default_ttl),
            hashes: HashStore::new(config.default_hash_ttl),
        }
    }
}

// == Memory Cache ==
/// In-process cache backend.
///
/// Owns its expiry-sweep task; `close` stops the task and makes every
/// subsequent operation fail fast with [`CacheError::Closed`].
pub struct MemoryCache {
    stores: Arc<RwLock<MemoryStores>>,
    closed: Arc<AtomicBool>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryCache {
    /// Creates the backend and starts its background sweep task.
    pub fn new(config: &CacheConfig) -> Self {
        let stores = Arc::new(RwLock::new(MemoryStores::from_config(config)));
        let reaper = spawn_cleanup_task(stores.clone(), config.cleanup_interval);

        Self {
            stores,
            closed: Arc::new(AtomicBool::new(false)),
            reaper: Mutex::new(Some(reaper)),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }

    // == Introspection ==
    /// Number of primary entries physically present.
    pub async fn kv_len(&self) -> usize {
        self.stores.read().await.kv.len()
    }

    /// Number of hashes physically present.
    pub async fn hash_len(&self) -> usize {
        self.stores.read().await.hashes.len()
    }

    /// Number of entries in the hash expiration index.
    pub async fn hash_index_len(&self) -> usize {
        self.stores.read().await.hashes.index_len()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        self.ensure_open()?;
        let stores = self.stores.read().await;
        Ok(stores.kv.get(key))
    }

    async fn set(&self, key: &str, value: CacheValue, ttl: Ttl) -> Result<()> {
        self.ensure_open()?;
        let mut stores = self.stores.write().await;
        stores.kv.set(key.to_string(), value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        let mut stores = self.stores.write().await;
        stores.kv.delete(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let stores = self.stores.read().await;
        Ok(stores.kv.exists(key))
    }

    async fn set_hash(
        &self,
        key: &str,
        fields: HashMap<String, CacheValue>,
        ttl: Ttl,
    ) -> Result<()> {
        self.ensure_open()?;
        let mut stores = self.stores.write().await;
        stores.hashes.set(key, fields, ttl)
    }

    async fn get_hash(&self, key: &str) -> Result<HashMap<String, CacheValue>> {
        self.ensure_open()?;
        // Write mode: an expired hash is evicted as a side effect of this
        // read.
        let mut stores = self.stores.write().await;
        stores.hashes.get_all(key)
    }

    async fn get_hash_field(&self, key: &str, field: &str) -> Result<CacheValue> {
        self.ensure_open()?;
        let stores = self.stores.read().await;
        stores.hashes.get_field(key, field)
    }

    async fn del_hash(&self, key: &str, field: &str) -> Result<()> {
        self.ensure_open()?;
        let mut stores = self.stores.write().await;
        stores.hashes.delete_field(key, field)
    }

    async fn exist_hash(&self, key: &str, field: &str) -> Result<bool> {
        self.ensure_open()?;
        let stores = self.stores.read().await;
        stores.hashes.exists_field(key, field)
    }

    async fn expire_hash(&self, key: &str, ttl: Ttl) -> Result<()> {
        self.ensure_open()?;
        let mut stores = self.stores.write().await;
        stores.hashes.expire(key, ttl)
    }

    async fn mset(&self, entries: HashMap<String, CacheValue>, ttl: Ttl) -> Result<()> {
        self.ensure_open()?;
        if entries.is_empty() {
            return Err(CacheError::InvalidArgument(
                "no entries given for mset".to_string(),
            ));
        }
        let mut stores = self.stores.write().await;
        stores.kv.mset(entries, ttl);
        Ok(())
    }

    async fn mget(&self, keys: &[&str]) -> Result<HashMap<String, CacheValue>> {
        self.ensure_open()?;
        let stores = self.stores.read().await;
        Ok(stores.kv.mget(keys))
    }

    async fn close(&self) -> Result<()> {
        // First close wins; any further call is a no-op.
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(handle) = self.reaper.lock().await.take() {
            handle.abort();
        }
        info!("memory cache closed, cleanup task stopped");
        Ok(())
    }
}

impl Drop for MemoryCache {
    fn drop(&mut self) {
        // A dropped-without-close cache must not leave its sweep task
        // running.
        if let Ok(mut guard) = self.reaper.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> CacheConfig {
        CacheConfig::default()
            .with_expiration(Some(Duration::from_secs(300)), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_namespaces_are_disjoint() {
        let cache = MemoryCache::new(&test_config());

        cache
            .set("k", CacheValue::from("primary"), Ttl::Default)
            .await
            .unwrap();
        let mut fields = HashMap::new();
        fields.insert("f".to_string(), CacheValue::from("hash"));
        cache.set_hash("k", fields, Ttl::Never).await.unwrap();

        // Deleting the primary entry leaves the hash intact, and vice versa.
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(
            cache.get_hash_field("k", "f").await.unwrap(),
            CacheValue::from("hash")
        );

        cache.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_operations_after_close_fail_fast() {
        let cache = MemoryCache::new(&test_config());
        cache.close().await.unwrap();

        assert!(matches!(cache.get("k").await, Err(CacheError::Closed)));
        assert!(matches!(
            cache.set("k", CacheValue::from(1i64), Ttl::Default).await,
            Err(CacheError::Closed)
        ));
        assert!(matches!(
            cache.get_hash("k").await,
            Err(CacheError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let cache = MemoryCache::new(&test_config());
        cache.close().await.unwrap();
        cache.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_mset_empty_rejected() {
        let cache = MemoryCache::new(&test_config());
        assert!(matches!(
            cache.mset(HashMap::new(), Ttl::Default).await,
            Err(CacheError::InvalidArgument(_))
        ));
        cache.close().await.unwrap();
    }
}
