use crate::core::cache::RateStore;
use crate::core::{CacheError, CurrencyCode};
use async_trait::async_trait;

/// Store used when no cache is configured or the cache was unreachable at
/// startup. Every read misses and every write is dropped.
#[derive(Debug, Clone, Default)]
pub struct DisabledStore;

#[async_trait]
impl RateStore for DisabledStore {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn get(&self, _from: &CurrencyCode, _to: &CurrencyCode) -> Result<f64, CacheError> {
        Err(CacheError::NotFound)
    }

    async fn set(
        &self,
        _from: &CurrencyCode,
        _to: &CurrencyCode,
        _rate: f64,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _from: &CurrencyCode, _to: &CurrencyCode) -> Result<(), CacheError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("cache disabled".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_store_always_misses() {
        let store = DisabledStore;
        let usd: CurrencyCode = "USD".parse().unwrap();
        let eur: CurrencyCode = "EUR".parse().unwrap();

        store.set(&usd, &eur, 0.9).await.unwrap();
        assert_eq!(store.get(&usd, &eur).await, Err(CacheError::NotFound));
        assert!(store.health_check().await.is_err());
    }
}
