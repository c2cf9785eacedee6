//! Configuration Module
//!
//! Construction-time settings for both backends, loadable from environment
//! variables with sensible defaults.

use std::env;
use std::time::Duration;

use crate::backend::Backend;

// == Defaults ==
const DEFAULT_ADDRESS: &str = "127.0.0.1:6379";
const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_CLEANUP_SECS: u64 = 600;
const DEFAULT_POOL_SIZE: usize = 100;

/// Cache configuration shared by both backends.
///
/// The memory backend reads `default_ttl`, `default_hash_ttl` and
/// `cleanup_interval`; the Redis backend additionally reads the connection
/// fields (`address`, `password`, `db`, `key_prefix`, `pool_size`).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Which backend to construct
    pub backend: Backend,
    /// Redis host:port
    pub address: String,
    /// Redis password, empty for none
    pub password: String,
    /// Redis logical database index
    pub db: i64,
    /// Prefix prepended to every key sent to the remote store
    pub key_prefix: String,
    /// Default expiration for primary entries written with `Ttl::Default`,
    /// `None` to never expire them
    pub default_ttl: Option<Duration>,
    /// Default expiration for hashes written with `Ttl::Default`,
    /// `None` to never expire them
    pub default_hash_ttl: Option<Duration>,
    /// Interval between background expiry sweeps (memory backend only)
    pub cleanup_interval: Duration,
    /// Connection pool size (Redis backend only)
    pub pool_size: usize,
}

impl CacheConfig {
    /// Creates a configuration for the given backend with default settings.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Creates a configuration by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory` or `redis` (default: memory)
    /// - `CACHE_ADDRESS` - Redis host:port (default: 127.0.0.1:6379)
    /// - `CACHE_PASSWORD` - Redis password (default: empty)
    /// - `CACHE_DB` - Redis database index (default: 0)
    /// - `CACHE_PREFIX` - key prefix for the remote store (default: empty)
    /// - `CACHE_DEFAULT_TTL` - default entry TTL in seconds, 0 to disable
    ///   (default: 300)
    /// - `CACHE_HASH_TTL` - default hash TTL in seconds, 0 to disable
    ///   (default: 0)
    /// - `CACHE_CLEANUP_INTERVAL` - sweep interval in seconds (default: 600)
    /// - `CACHE_POOL_SIZE` - Redis connection pool size (default: 100)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backend),
            address: env::var("CACHE_ADDRESS").unwrap_or(defaults.address),
            password: env::var("CACHE_PASSWORD").unwrap_or(defaults.password),
            db: env::var("CACHE_DB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.db),
            key_prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.key_prefix),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(ttl_secs)
                .unwrap_or(defaults.default_ttl),
            default_hash_ttl: env::var("CACHE_HASH_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(ttl_secs)
                .unwrap_or(defaults.default_hash_ttl),
            cleanup_interval: env::var("CACHE_CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            pool_size: env::var("CACHE_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.pool_size),
        }
    }

    // == Builder Setters ==
    /// Sets the Redis connection parameters.
    pub fn with_redis(
        mut self,
        address: impl Into<String>,
        password: impl Into<String>,
        key_prefix: impl Into<String>,
        db: i64,
    ) -> Self {
        self.address = address.into();
        self.password = password.into();
        self.key_prefix = key_prefix.into();
        self.db = db;
        self
    }

    /// Sets the default entry TTL and the background sweep interval.
    pub fn with_expiration(
        mut self,
        default_ttl: Option<Duration>,
        cleanup_interval: Duration,
    ) -> Self {
        self.default_ttl = default_ttl;
        self.cleanup_interval = cleanup_interval;
        self
    }

    /// Sets the Redis connection pool size.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Sets the default hash TTL.
    pub fn with_hash_ttl(mut self, ttl: Duration) -> Self {
        self.default_hash_ttl = Some(ttl);
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            address: DEFAULT_ADDRESS.to_string(),
            password: String::new(),
            db: 0,
            key_prefix: String::new(),
            default_ttl: Some(Duration::from_secs(DEFAULT_TTL_SECS)),
            default_hash_ttl: None,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_SECS),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Maps a seconds value from the environment onto an optional TTL, where 0
/// means "never expire".
fn ttl_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}
