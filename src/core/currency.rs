//! Currency conversion abstractions

use crate::core::context::RequestContext;
use crate::core::error::{ConversionError, ProviderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A three letter currency code such as `USD`, stored uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 3 || !s.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(ConversionError::InvalidCurrencyCode(s.to_string()));
        }
        Ok(CurrencyCode(s.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub rate: f64,
    pub result: f64,
}

/// Source of truth for exchange rates.
#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    /// Fetches the number of `to` units per one `from` unit.
    async fn fetch_rate(
        &self,
        ctx: &RequestContext,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<f64, ProviderError>;
}

/// Capability exposed to callers such as the HTTP layer and the CLI.
#[async_trait]
pub trait ConversionService: Send + Sync {
    async fn convert(
        &self,
        ctx: &RequestContext,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<Conversion, ConversionError>;

    async fn resolve_rate(
        &self,
        ctx: &RequestContext,
        from: &str,
        to: &str,
    ) -> Result<f64, ConversionError>;
}
