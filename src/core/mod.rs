//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod context;
pub mod currency;
pub mod error;
pub mod log;

// Re-export main types for cleaner imports
pub use cache::RateStore;
pub use context::{Interrupted, RequestContext};
pub use currency::{Conversion, ConversionService, CurrencyCode, CurrencyRateProvider};
pub use error::{CacheError, ConversionError, ProviderError};
