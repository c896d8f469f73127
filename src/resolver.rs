//! Cache-aside exchange rate resolution.
//!
//! A lookup reads the store first and only goes to the origin on a miss or a
//! store failure. Origin results are written back by a detached task, so the
//! caller never waits on the store. Two concurrent misses for the same pair
//! both reach the origin and both write back; the entries converge on the
//! next TTL cycle.
//!
//! Pending writes are tracked so a shutting-down process can let them land
//! with [`RateResolver::flush_writes`].

use crate::core::cache::RateStore;
use crate::core::{CacheError, ConversionError, CurrencyCode, CurrencyRateProvider, RequestContext};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

/// Deadline for the background cache write, independent of the request.
pub const CACHE_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RateResolver {
    store: Arc<dyn RateStore>,
    provider: Arc<dyn CurrencyRateProvider>,
    write_timeout: Duration,
    writes: TaskTracker,
}

impl RateResolver {
    pub fn new(store: Arc<dyn RateStore>, provider: Arc<dyn CurrencyRateProvider>) -> Self {
        Self {
            store,
            provider,
            write_timeout: CACHE_WRITE_TIMEOUT,
            writes: TaskTracker::new(),
        }
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Returns how many `to` units one `from` unit buys.
    ///
    /// Only origin failures are returned as errors; the store is best effort.
    #[instrument(name = "ResolveRate", skip(self, ctx))]
    pub async fn resolve_rate(
        &self,
        ctx: &RequestContext,
        from: &str,
        to: &str,
    ) -> Result<f64, ConversionError> {
        let from: CurrencyCode = from.parse()?;
        let to: CurrencyCode = to.parse()?;
        if from == to {
            return Ok(1.0);
        }

        match ctx.run(self.store.get(&from, &to)).await {
            Ok(Ok(rate)) => {
                debug!(rate, "Cache hit");
                return Ok(rate);
            }
            Ok(Err(CacheError::NotFound)) => debug!("Cache miss"),
            Ok(Err(e)) => warn!(error = %e, "Cache error (will try API)"),
            Err(interrupted) => warn!(?interrupted, "Cache read interrupted (will try API)"),
        }

        let rate = self
            .provider
            .fetch_rate(ctx, &from, &to)
            .await
            .map_err(ConversionError::OriginUnavailable)?;

        self.populate(from, to, rate);
        Ok(rate)
    }

    /// Writes an origin rate back without tying it to the request.
    fn populate(&self, from: CurrencyCode, to: CurrencyCode, rate: f64) {
        let store = Arc::clone(&self.store);
        let timeout = self.write_timeout;
        self.writes.spawn(async move {
            match tokio::time::timeout(timeout, store.set(&from, &to, rate)).await {
                Ok(Ok(())) => debug!(%from, %to, rate, "Rate cached"),
                Ok(Err(e)) => {
                    warn!(%from, %to, error = %e, "Failed to cache rate (non-critical)")
                }
                Err(_) => warn!(%from, %to, ?timeout, "Cache write timed out (non-critical)"),
            }
        });
    }

    /// Waits for every cache write spawned so far. Each one is bounded by
    /// the write timeout, so this returns within that timeout.
    pub async fn flush_writes(&self) {
        self.writes.close();
        if !self.writes.is_empty() {
            info!(pending = self.writes.len(), "Waiting for pending cache writes");
        }
        self.writes.wait().await;
        self.writes.reopen();
    }
}
