//! Error kinds surfaced by the rate resolution path.

use std::time::Duration;
use thiserror::Error;

/// Errors returned to callers of the conversion service.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("invalid currency code: {0:?} (expected 3 letters)")]
    InvalidCurrencyCode(String),

    #[error("amount must be positive, got: {0:.2}")]
    InvalidAmount(f64),

    #[error("failed to get rate from origin: {0}")]
    OriginUnavailable(#[source] ProviderError),
}

impl ConversionError {
    /// Whether the error is the caller's fault and safe to describe back to them.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConversionError::InvalidCurrencyCode(_) | ConversionError::InvalidAmount(_)
        )
    }
}

/// Errors from the upstream exchange-rate API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API request timeout after {0:.2?}")]
    Timeout(Duration),

    #[error("API request canceled")]
    Canceled,

    #[error("API request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid JSON response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("exchange rate API error: {reason}")]
    Api { reason: String },

    #[error("currency {currency} not found in API response")]
    CurrencyNotSupported {
        currency: String,
        available: Vec<String>,
    },
}

/// Errors from a rate store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CacheError {
    #[error("exchange rate not found in cache")]
    NotFound,

    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("invalid cached exchange rate: {0}")]
    Corrupt(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}
