use crate::core::cache::{RateStore, cache_key};
use crate::core::{CacheError, CurrencyCode};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct CacheValue {
    rate: f64,
    expires_at: Instant,
}

/// In-process rate store with per-entry TTL, for local development and tests.
#[derive(Clone)]
pub struct MemoryRateStore {
    inner: Arc<Mutex<HashMap<String, CacheValue>>>,
    ttl: Duration,
}

impl MemoryRateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Expired entries stay counted until they are read.
    #[cfg(test)]
    async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<f64, CacheError> {
        let key = cache_key(from, to);
        let mut cache = self.inner.lock().await;
        match cache.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                debug!("Cache HIT for key: {}", key);
                Ok(entry.rate)
            }
            Some(_) => {
                debug!("Cache entry expired for key: {}", key);
                cache.remove(&key);
                Err(CacheError::NotFound)
            }
            None => {
                debug!("Cache MISS for key: {}", key);
                Err(CacheError::NotFound)
            }
        }
    }

    async fn set(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        rate: f64,
    ) -> Result<(), CacheError> {
        let key = cache_key(from, to);
        let value = CacheValue {
            rate,
            expires_at: Instant::now() + self.ttl,
        };
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {}", key);
        cache.insert(key, value);
        Ok(())
    }

    async fn delete(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<(), CacheError> {
        let key = cache_key(from, to);
        let mut cache = self.inner.lock().await;
        cache.remove(&key);
        debug!("Cache REMOVE for key: {}", key);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
