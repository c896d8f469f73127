//! Test doubles shared by unit tests.

use crate::core::cache::RateStore;
use crate::core::{CacheError, CurrencyCode, CurrencyRateProvider, ProviderError, RequestContext};
use crate::store::memory::MemoryRateStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn code(s: &str) -> CurrencyCode {
    s.parse().unwrap()
}

/// Provider answering from a fixed table, or failing with a chosen error.
pub struct MockRateProvider {
    rates: HashMap<(String, String), f64>,
    failure: Option<fn() -> ProviderError>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl MockRateProvider {
    pub fn new() -> Self {
        Self {
            rates: HashMap::new(),
            failure: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_rate(mut self, from: &str, to: &str, rate: f64) -> Self {
        self.rates.insert((from.to_string(), to.to_string()), rate);
        self
    }

    pub fn failing(mut self, failure: fn() -> ProviderError) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CurrencyRateProvider for MockRateProvider {
    async fn fetch_rate(
        &self,
        ctx: &RequestContext,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<f64, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ctx.is_cancelled() {
            return Err(ProviderError::Canceled);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(failure) = self.failure {
            return Err(failure());
        }
        self.rates
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .ok_or_else(|| ProviderError::CurrencyNotSupported {
                currency: to.to_string(),
                available: Vec::new(),
            })
    }
}

/// Memory store that counts calls and can simulate an outage or slow writes.
pub struct RecordingStore {
    pub inner: MemoryRateStore,
    outage: Option<CacheError>,
    write_delay: Duration,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryRateStore::new(Duration::from_secs(60)),
            outage: None,
            write_delay: Duration::ZERO,
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            outage: Some(CacheError::Unavailable("connection refused".to_string())),
            ..Self::new()
        }
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Polls until the background write for `from -> to` lands or a second passes.
    pub async fn wait_for(&self, from: &str, to: &str) -> Option<f64> {
        for _ in 0..100 {
            if let Ok(rate) = self.inner.get(&code(from), &code(to)).await {
                return Some(rate);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}

#[async_trait]
impl RateStore for RecordingStore {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn get(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<f64, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.outage {
            return Err(err.clone());
        }
        self.inner.get(from, to).await
    }

    async fn set(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        rate: f64,
    ) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if let Some(err) = &self.outage {
            return Err(err.clone());
        }
        self.inner.set(from, to, rate).await
    }

    async fn delete(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<(), CacheError> {
        self.inner.delete(from, to).await
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        match &self.outage {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
