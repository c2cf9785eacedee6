//! TTL Cleanup Task
//!
//! Background task that periodically reclaims expired entries from the
//! memory backend: expired primary entries and every hash whose expiration
//! instant has passed, index entry included.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::memory::MemoryStores;

/// Spawns the periodic expiry sweep for a memory cache.
///
/// The task sleeps for `interval` between runs, then takes one write lock
/// over both stores and removes everything whose TTL has lapsed. It performs
/// no I/O; the only contention is with foreground operations on the same
/// lock. The returned handle is aborted exactly once, when the owning cache
/// closes.
pub(crate) fn spawn_cleanup_task(
    stores: Arc<RwLock<MemoryStores>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs_f64(), "cleanup task started");

        loop {
            tokio::time::sleep(interval).await;

            let (kv_removed, hashes_removed) = {
                let mut stores = stores.write().await;
                (stores.kv.sweep_expired(), stores.hashes.sweep_expired())
            };

            if kv_removed > 0 || hashes_removed > 0 {
                info!(
                    kv_removed,
                    hashes_removed, "cleanup removed expired entries"
                );
            } else {
                debug!("cleanup found no expired entries");
            }
        }
    })
}
