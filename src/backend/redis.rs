//! Redis Backend
//!
//! Thin pass-through to a Redis server: every operation maps onto the
//! corresponding native command over a pooled connection. Keys are
//! namespaced with the configured prefix before transmission. Primary
//! values travel as JSON; hash fields travel through the same tagging codec
//! as the memory backend, so the two backends store bit-identical field
//! encodings.
//!
//! Expiry is owned by the server here — there is no sweep task and no
//! `Expired` distinction: a lapsed key simply reads as absent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::info;

use crate::codec;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::value::{CacheValue, Ttl};

use super::Cache;

// == Redis Cache ==
/// Redis-backed implementation of the cache contract.
pub struct RedisCache {
    pool: Pool,
    key_prefix: String,
    default_ttl: Option<Duration>,
    default_hash_ttl: Option<Duration>,
    closed: AtomicBool,
}

impl RedisCache {
    /// Connects to the server described by `config` and verifies the
    /// connection with a PING.
    ///
    /// # Example
    /// ```no_run
    /// use unicache::{Backend, CacheConfig, RedisCache};
    ///
    /// # async fn example() -> unicache::Result<()> {
    /// let config = CacheConfig::new(Backend::Redis)
    ///     .with_redis("127.0.0.1:6379", "", "app:", 0);
    /// let cache = RedisCache::connect(&config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let mut pool_config = PoolConfig::from_url(connection_url(config));
        pool_config.pool = Some(deadpool_redis::PoolConfig::new(config.pool_size));
        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Connection(format!("failed to create pool: {}", e)))?;

        let cache = Self {
            pool,
            key_prefix: config.key_prefix.clone(),
            default_ttl: config.default_ttl,
            default_hash_ttl: config.default_hash_ttl,
            closed: AtomicBool::new(false),
        };

        // Fail at construction, not on first use, when the server is
        // unreachable.
        let mut conn = cache.conn().await?;
        let _: () = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(redis_err)?;

        info!(address = %config.address, "connected to redis");
        Ok(cache)
    }

    /// Builds the full key with the configured namespace prefix.
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }

    async fn conn(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(format!("failed to get pooled connection: {}", e)))
    }

    /// Distinguishes "key absent" from "field absent" after a miss on a
    /// field-level command.
    async fn field_miss(&self, conn: &mut Connection, key: &str, field: &str) -> CacheError {
        match conn.exists::<_, bool>(self.full_key(key)).await {
            Ok(true) => CacheError::FieldNotFound {
                key: key.to_string(),
                field: field.to_string(),
            },
            Ok(false) => CacheError::NotFound(key.to_string()),
            Err(e) => redis_err(e),
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        self.ensure_open()?;
        let mut conn = self.conn().await?;
        let bytes: Option<Vec<u8>> = conn
            .get(self.full_key(key))
            .await
            .map_err(redis_err)?;

        match bytes {
            Some(bytes) => {
                let json: serde_json::Value = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::Encoding(e.to_string()))?;
                Ok(Some(CacheValue::from_json(json)))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: CacheValue, ttl: Ttl) -> Result<()> {
        self.ensure_open()?;
        let bytes = serde_json::to_vec(&value.to_json())
            .map_err(|e| CacheError::Encoding(e.to_string()))?;
        let mut conn = self.conn().await?;

        match ttl.resolve(self.default_ttl) {
            Some(d) => {
                let _: () = conn
                    .set_ex(self.full_key(key), bytes, ttl_secs(d))
                    .await
                    .map_err(redis_err)?;
            }
            None => {
                let _: () = conn
                    .set(self.full_key(key), bytes)
                    .await
                    .map_err(redis_err)?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        let mut conn = self.conn().await?;
        let _: () = conn.del(self.full_key(key)).await.map_err(redis_err)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let mut conn = self.conn().await?;
        conn.exists(self.full_key(key)).await.map_err(redis_err)
    }

    async fn set_hash(
        &self,
        key: &str,
        fields: HashMap<String, CacheValue>,
        ttl: Ttl,
    ) -> Result<()> {
        self.ensure_open()?;
        if fields.is_empty() {
            return Err(CacheError::InvalidArgument(format!(
                "no fields given for hash {}",
                key
            )));
        }

        let mut tagged = Vec::with_capacity(fields.len());
        for (field, value) in &fields {
            let encoded = codec::encode(value).map_err(|e| CacheError::UnsupportedType {
                field: field.clone(),
                reason: e.to_string(),
            })?;
            tagged.push((field.clone(), encoded));
        }

        let full_key = self.full_key(key);
        let mut conn = self.conn().await?;
        let _: () = conn
            .hset_multiple(&full_key, &tagged)
            .await
            .map_err(redis_err)?;

        // Same policy as the memory backend: the TTL of this call replaces
        // the hash's expiration, and `Never` clears it.
        match ttl.resolve(self.default_hash_ttl) {
            Some(d) => {
                let _: () = conn
                    .expire(&full_key, ttl_secs(d) as i64)
                    .await
                    .map_err(redis_err)?;
            }
            None => {
                let _: () = conn.persist(&full_key).await.map_err(redis_err)?;
            }
        }
        Ok(())
    }

    async fn get_hash(&self, key: &str) -> Result<HashMap<String, CacheValue>> {
        self.ensure_open()?;
        let mut conn = self.conn().await?;
        let raw: HashMap<String, String> = conn
            .hgetall(self.full_key(key))
            .await
            .map_err(redis_err)?;

        // HGETALL reports a missing key as an empty reply; the contract
        // reports it as an error.
        if raw.is_empty() {
            return Err(CacheError::NotFound(key.to_string()));
        }

        let mut result = HashMap::with_capacity(raw.len());
        for (field, tagged) in raw {
            result.insert(field, codec::decode(&tagged));
        }
        Ok(result)
    }

    async fn get_hash_field(&self, key: &str, field: &str) -> Result<CacheValue> {
        self.ensure_open()?;
        let mut conn = self.conn().await?;
        let tagged: Option<String> = conn
            .hget(self.full_key(key), field)
            .await
            .map_err(redis_err)?;

        match tagged {
            Some(tagged) => Ok(codec::decode(&tagged)),
            None => Err(self.field_miss(&mut conn, key, field).await),
        }
    }

    async fn del_hash(&self, key: &str, field: &str) -> Result<()> {
        self.ensure_open()?;
        let mut conn = self.conn().await?;
        let removed: i64 = conn
            .hdel(self.full_key(key), field)
            .await
            .map_err(redis_err)?;

        if removed == 0 {
            return Err(self.field_miss(&mut conn, key, field).await);
        }
        Ok(())
    }

    async fn exist_hash(&self, key: &str, field: &str) -> Result<bool> {
        self.ensure_open()?;
        let mut conn = self.conn().await?;
        conn.hexists(self.full_key(key), field)
            .await
            .map_err(redis_err)
    }

    async fn expire_hash(&self, key: &str, ttl: Ttl) -> Result<()> {
        self.ensure_open()?;
        let full_key = self.full_key(key);
        let mut conn = self.conn().await?;

        match ttl.resolve(self.default_hash_ttl) {
            Some(d) => {
                let applied: bool = conn
                    .expire(&full_key, ttl_secs(d) as i64)
                    .await
                    .map_err(redis_err)?;
                if !applied {
                    return Err(CacheError::NotFound(key.to_string()));
                }
            }
            None => {
                let exists: bool = conn.exists(&full_key).await.map_err(redis_err)?;
                if !exists {
                    return Err(CacheError::NotFound(key.to_string()));
                }
                let _: bool = conn.persist(&full_key).await.map_err(redis_err)?;
            }
        }
        Ok(())
    }

    async fn mset(&self, entries: HashMap<String, CacheValue>, ttl: Ttl) -> Result<()> {
        self.ensure_open()?;
        if entries.is_empty() {
            return Err(CacheError::InvalidArgument(
                "no entries given for mset".to_string(),
            ));
        }

        let resolved = ttl.resolve(self.default_ttl);
        let mut conn = self.conn().await?;
        for (key, value) in entries {
            let bytes = serde_json::to_vec(&value.to_json())
                .map_err(|e| CacheError::Encoding(e.to_string()))?;
            match resolved {
                Some(d) => {
                    let _: () = conn
                        .set_ex(self.full_key(&key), bytes, ttl_secs(d))
                        .await
                        .map_err(redis_err)?;
                }
                None => {
                    let _: () = conn
                        .set(self.full_key(&key), bytes)
                        .await
                        .map_err(redis_err)?;
                }
            }
        }
        Ok(())
    }

    async fn mget(&self, keys: &[&str]) -> Result<HashMap<String, CacheValue>> {
        self.ensure_open()?;
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let full_keys: Vec<String> = keys.iter().map(|k| self.full_key(k)).collect();
        let mut conn = self.conn().await?;
        // A multi-key GET is issued as MGET on the wire.
        let values: Vec<Option<Vec<u8>>> =
            conn.get(&full_keys).await.map_err(redis_err)?;

        let mut result = HashMap::with_capacity(keys.len());
        for (key, bytes) in keys.iter().zip(values) {
            if let Some(bytes) = bytes {
                let json: serde_json::Value = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::Encoding(e.to_string()))?;
                result.insert((*key).to_string(), CacheValue::from_json(json));
            }
        }
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.pool.close();
        info!("redis cache closed");
        Ok(())
    }
}

// == Helpers ==
/// Builds the connection URL from the address/password/db fields.
fn connection_url(config: &CacheConfig) -> String {
    if config.password.is_empty() {
        format!("redis://{}/{}", config.address, config.db)
    } else {
        format!("redis://:{}@{}/{}", config.password, config.address, config.db)
    }
}

/// Whole seconds for the server-side TTL commands, never below one second.
fn ttl_secs(d: Duration) -> u64 {
    d.as_secs().max(1)
}

/// Splits remote failures into connection-level and protocol-level kinds.
fn redis_err(e: redis::RedisError) -> CacheError {
    if e.is_io_error() || e.is_timeout() || e.is_connection_refusal() || e.is_connection_dropped()
    {
        CacheError::Connection(e.to_string())
    } else {
        CacheError::Protocol(e.to_string())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;

    #[test]
    fn test_connection_url() {
        let config = CacheConfig::new(Backend::Redis);
        assert_eq!(connection_url(&config), "redis://127.0.0.1:6379/0");

        let config = config.with_redis("10.0.0.5:6380", "s3cret", "", 3);
        assert_eq!(connection_url(&config), "redis://:s3cret@10.0.0.5:6380/3");
    }

    #[test]
    fn test_ttl_secs_floors_at_one() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(90)), 90);
    }

    // Exercised only when a local server is reachable, mirroring how the
    // backend is meant to be smoke-tested.
    #[tokio::test]
    async fn test_round_trip_against_local_server() {
        let config = CacheConfig::new(Backend::Redis).with_redis(
            "127.0.0.1:6379",
            "",
            "unicache_test:",
            0,
        );
        let Ok(cache) = RedisCache::connect(&config).await else {
            eprintln!("redis not running, skipping");
            return;
        };

        cache
            .set("k", CacheValue::from("v"), Ttl::seconds(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("k").await.unwrap(),
            Some(CacheValue::from("v"))
        );
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.close().await.unwrap();
    }
}
