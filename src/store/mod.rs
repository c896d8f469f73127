pub mod disabled;
pub mod memory;
pub mod redis_store;

use crate::core::cache::RateStore;
use crate::core::config::{CacheBackend, CacheConfig};
use disabled::DisabledStore;
use memory::MemoryRateStore;
use redis_store::RedisRateStore;
use std::sync::Arc;
use tracing::{error, info};

/// Builds the configured rate store.
///
/// An unreachable Redis never stops startup: the service falls back to the
/// disabled store and keeps converting straight from the origin.
pub async fn connect(config: &CacheConfig) -> Arc<dyn RateStore> {
    match config.backend {
        CacheBackend::Redis => {
            match RedisRateStore::connect(
                &config.url,
                config.ttl(),
                config.op_timeout(),
                config.connect_timeout(),
            )
            .await
            {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!(error = %e, "Failed to connect to Redis, continuing without cache");
                    Arc::new(DisabledStore)
                }
            }
        }
        CacheBackend::Memory => {
            info!(ttl = ?config.ttl(), "Using in-memory rate cache");
            Arc::new(MemoryRateStore::new(config.ttl()))
        }
        CacheBackend::Disabled => {
            info!("Rate cache disabled");
            Arc::new(DisabledStore)
        }
    }
}
