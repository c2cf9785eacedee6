//! Unicache - one cache interface, two backends
//!
//! Presents a single key-value and hash-table contract over an in-process
//! memory store and a Redis server; which one sits behind the [`Cache`]
//! trait is decided by configuration alone.

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod tasks;
pub mod value;

pub use backend::{new_cache, Backend, Cache, MemoryCache, RedisCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use value::{CacheValue, Ttl};
