//! Backend Module
//!
//! The unified cache contract and the two backends that implement it.
//! Callers depend only on the [`Cache`] trait; which backend sits behind it
//! is decided by configuration alone.

pub mod memory;
pub mod redis;

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::info;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::value::{CacheValue, Ttl};

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

// == Backend Selector ==
/// Which backend a [`CacheConfig`] constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// In-process store with its own expiry sweeping
    Memory,
    /// Pass-through to a Redis server
    Redis,
}

impl FromStr for Backend {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(Backend::Memory),
            "redis" => Ok(Backend::Redis),
            other => Err(CacheError::InvalidArgument(format!(
                "unsupported cache backend: {}",
                other
            ))),
        }
    }
}

// == Cache Trait ==
/// The unified cache contract.
///
/// Both backends implement every operation with the same observable
/// semantics, including which failures are errors and which are reported
/// through the return value:
///
/// - `get`/`exists`/`mget` treat a missing or expired key as plain absence.
/// - `get_hash`/`get_hash_field`/`del_hash`/`expire_hash` treat a missing
///   key as [`CacheError::NotFound`], and a lapsed hash TTL as
///   [`CacheError::Expired`].
/// - `exist_hash` reports a missing key as `false` but a lapsed TTL as
///   [`CacheError::Expired`].
///
/// Hash field values pass through the tagging codec in both directions, so a
/// field written as an `Int` is read back as an `Int` on either backend.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Retrieves a value, `None` if the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Stores a value, overwriting any existing entry.
    async fn set(&self, key: &str, value: CacheValue, ttl: Ttl) -> Result<()>;

    /// Removes a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Reports whether a key exists and is live, without fetching the value.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Merges fields into the hash at `key`, creating it if absent, and
    /// applies `ttl` to the whole hash.
    async fn set_hash(
        &self,
        key: &str,
        fields: HashMap<String, CacheValue>,
        ttl: Ttl,
    ) -> Result<()>;

    /// Retrieves every field of the hash at `key`, decoded.
    async fn get_hash(&self, key: &str) -> Result<HashMap<String, CacheValue>>;

    /// Retrieves one field of the hash at `key`, decoded.
    async fn get_hash_field(&self, key: &str, field: &str) -> Result<CacheValue>;

    /// Removes one field. Removing the last field removes the hash itself.
    async fn del_hash(&self, key: &str, field: &str) -> Result<()>;

    /// Reports whether the hash at `key` contains `field`.
    async fn exist_hash(&self, key: &str, field: &str) -> Result<bool>;

    /// Replaces the expiration of the hash at `key`; `Ttl::Never` clears it.
    async fn expire_hash(&self, key: &str, ttl: Ttl) -> Result<()>;

    /// Stores every entry in `entries` with the same TTL.
    async fn mset(&self, entries: HashMap<String, CacheValue>, ttl: Ttl) -> Result<()>;

    /// Retrieves the live subset of `keys`; absent and expired keys are
    /// omitted from the result, never an error.
    async fn mget(&self, keys: &[&str]) -> Result<HashMap<String, CacheValue>>;

    /// Releases backend resources. Safe to call more than once; operations
    /// after close fail with [`CacheError::Closed`].
    async fn close(&self) -> Result<()>;
}

// == Factory ==
/// Constructs the backend selected by `config.backend`.
///
/// # Example
/// ```no_run
/// use unicache::{new_cache, Backend, Cache, CacheConfig, CacheValue, Ttl};
///
/// # async fn example() -> unicache::Result<()> {
/// let cache = new_cache(CacheConfig::new(Backend::Memory)).await?;
/// cache.set("greeting", CacheValue::from("hello"), Ttl::Default).await?;
/// # Ok(())
/// # }
/// ```
pub async fn new_cache(config: CacheConfig) -> Result<Box<dyn Cache>> {
    match config.backend {
        Backend::Memory => {
            info!("initializing memory cache backend");
            Ok(Box::new(MemoryCache::new(&config)))
        }
        Backend::Redis => {
            info!(address = %config.address, "initializing redis cache backend");
            Ok(Box::new(RedisCache::connect(&config).await?))
        }
    }
}
