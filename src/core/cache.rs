use crate::core::currency::CurrencyCode;
use crate::core::error::CacheError;
use async_trait::async_trait;

/// Key-value store for exchange rates, addressed by a directional currency pair.
///
/// `get` must report an absent key as [`CacheError::NotFound`] so callers can
/// tell a miss apart from a store that is down.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Short backend name used in health output.
    fn name(&self) -> &'static str;

    async fn get(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<f64, CacheError>;

    /// Stores `rate` with the store's configured TTL.
    async fn set(&self, from: &CurrencyCode, to: &CurrencyCode, rate: f64)
    -> Result<(), CacheError>;

    async fn delete(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<(), CacheError>;

    async fn health_check(&self) -> Result<(), CacheError>;
}

/// Storage key for a pair; `(USD, EUR)` and `(EUR, USD)` are distinct entries.
pub fn cache_key(from: &CurrencyCode, to: &CurrencyCode) -> String {
    format!("rate:{from}:{to}")
}

/// Stored representation of a rate.
pub fn encode_rate(rate: f64) -> String {
    rate.to_string()
}

pub fn decode_rate(raw: &str) -> Result<f64, CacheError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| CacheError::Corrupt(format!("{raw:?}: {e}")))
}
