use crate::core::cache::{RateStore, cache_key, decode_rate, encode_rate};
use crate::core::{CacheError, CurrencyCode};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Rate store backed by Redis, shared by all requests through a multiplexed
/// connection manager.
#[derive(Clone)]
pub struct RedisRateStore {
    conn: ConnectionManager,
    ttl: Duration,
    op_timeout: Duration,
}

impl RedisRateStore {
    /// Connects and verifies the server answers `PING` within `connect_timeout`.
    pub async fn connect(
        url: &str,
        ttl: Duration,
        op_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                CacheError::Unavailable(format!("connect timed out after {connect_timeout:?}"))
            })??;

        let store = Self {
            conn,
            ttl,
            op_timeout,
        };
        store.health_check().await?;
        info!(ttl = ?ttl, "Connected to Redis");
        Ok(store)
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        with_op_timeout(op, self.op_timeout, fut).await
    }
}

/// Bounds a single command by the store's own timeout, independent of any request.
async fn with_op_timeout<T, F>(
    op: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, CacheError>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|e| {
            warn!(op, error = %e, "Redis command failed");
            CacheError::from(e)
        }),
        Err(_) => Err(CacheError::Unavailable(format!("{op} timed out after {timeout:?}"))),
    }
}

/// Maps a `GET` reply: nil is a miss, anything else must decode to a rate.
fn rate_from_reply(reply: redis::Value) -> Result<f64, CacheError> {
    let raw: Option<String> = redis::from_owned_redis_value(reply)
        .map_err(|e| CacheError::Corrupt(e.to_string()))?;
    match raw {
        Some(raw) => decode_rate(&raw),
        None => Err(CacheError::NotFound),
    }
}

fn set_command(key: &str, rate: f64, ttl: Duration) -> redis::Cmd {
    // EX 0 is rejected by Redis.
    let seconds = ttl.as_secs().max(1);
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(encode_rate(rate)).arg("EX").arg(seconds);
    cmd
}

#[async_trait]
impl RateStore for RedisRateStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<f64, CacheError> {
        let key = cache_key(from, to);
        let mut conn = self.conn.clone();
        let reply: redis::Value = self
            .bounded("GET", redis::cmd("GET").arg(&key).query_async(&mut conn))
            .await?;
        rate_from_reply(reply)
    }

    async fn set(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        rate: f64,
    ) -> Result<(), CacheError> {
        let key = cache_key(from, to);
        let mut conn = self.conn.clone();
        let cmd = set_command(&key, rate, self.ttl);
        let _: () = self.bounded("SET", cmd.query_async(&mut conn)).await?;
        debug!(key = %key, rate, ttl = ?self.ttl, "Exchange rate saved to Redis");
        Ok(())
    }

    async fn delete(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<(), CacheError> {
        let key = cache_key(from, to);
        let mut conn = self.conn.clone();
        let _: i64 = self
            .bounded("DEL", redis::cmd("DEL").arg(&key).query_async(&mut conn))
            .await?;
        debug!(key = %key, "Exchange rate deleted from cache");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = self
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }
}
