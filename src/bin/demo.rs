//! Demo walkthrough for both cache backends.
//!
//! Runs the full operation surface against the memory backend, then
//! attempts the same against a local Redis server, falling back to memory
//! when none is reachable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unicache::{new_cache, Backend, Cache, CacheConfig, CacheValue, Ttl};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unicache=info,demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Memory backend with defaults.
    let mem_cache = new_cache(CacheConfig::new(Backend::Memory)).await?;

    // Redis backend with custom settings, falling back to memory when the
    // server is unreachable.
    let redis_config = CacheConfig::new(Backend::Redis)
        .with_redis("127.0.0.1:6379", "", "demo:", 0)
        .with_hash_ttl(Duration::from_secs(30 * 60));
    let cache = match new_cache(redis_config).await {
        Ok(cache) => {
            info!("using redis backend");
            cache
        }
        Err(e) => {
            warn!("redis unavailable ({}), falling back to memory", e);
            mem_cache
        }
    };

    // Basic key-value operations.
    let key = "user:1001:name";
    cache
        .set(key, CacheValue::from("zhangsan"), Ttl::seconds(5 * 60))
        .await?;
    match cache.get(key).await? {
        Some(value) => info!(key, ?value, "got value"),
        None => info!(key, "value absent"),
    }

    // Hash-table operations.
    let hash_key = "user:1001:profile";
    let mut profile = HashMap::new();
    profile.insert("name".to_string(), CacheValue::from("lisi"));
    profile.insert("age".to_string(), CacheValue::from(28i64));
    profile.insert("active".to_string(), CacheValue::from(true));
    cache
        .set_hash(hash_key, profile, Ttl::seconds(3600))
        .await?;

    let age = cache.get_hash_field(hash_key, "age").await?;
    info!(?age, "got hash field");

    let active = cache.exist_hash(hash_key, "active").await?;
    info!(active, "checked field presence");

    // Batch operations.
    let mut batch = HashMap::new();
    for i in 0..5 {
        batch.insert(format!("batch:{}", i), CacheValue::from(i as i64));
    }
    cache.mset(batch, Ttl::Default).await?;
    let found = cache.mget(&["batch:0", "batch:4", "batch:9"]).await?;
    info!(found = found.len(), "mget returned live keys");

    // A small write burst for a feel of throughput.
    let start = Instant::now();
    for i in 0..1000 {
        cache
            .set(
                &format!("benchmark:{}", i),
                CacheValue::from(i as i64),
                Ttl::Default,
            )
            .await?;
    }
    info!(elapsed = ?start.elapsed(), "1000 writes");

    // Cleanup.
    cache.delete(key).await?;
    cache.del_hash(hash_key, "age").await?;
    cache.close().await?;
    info!("done");

    Ok(())
}
