use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use redis::Client;
use redis::Script;

use crate::domain::rate_limit::errors::RateLimitError;
use crate::domain::rate_limit::ports::RateLimiter;

const KEY_PREFIX: &str = "rate_limit:";

/// INCR, start the window on the first hit, compare. Runs atomically on the
/// server.
const FIXED_WINDOW_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
end
if current > tonumber(ARGV[1]) then
    return 0
end
return 1
"#;

/// Fixed-window limiter shared by every instance through Redis.
#[derive(Clone)]
pub struct RedisRateLimiter {
    connection: MultiplexedConnection,
    script: Script,
}

fn store_error(e: redis::RedisError) -> RateLimitError {
    RateLimitError::StoreError(e.to_string())
}

impl RedisRateLimiter {
    /// Connect to Redis.
    ///
    /// # Errors
    /// * `StoreError` - Invalid URL or server unreachable
    pub async fn connect(url: &str) -> Result<Self, RateLimitError> {
        tracing::info!("Connecting to Redis...");

        let client = Client::open(url).map_err(store_error)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_error)?;

        tracing::info!("Redis connection established");

        Ok(Self {
            connection,
            script: Script::new(FIXED_WINDOW_SCRIPT),
        })
    }

    fn key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn allow(&self, key: &str, limit: u32, window: Duration) -> Result<bool, RateLimitError> {
        let mut conn = self.connection.clone();

        let allowed: i32 = self
            .script
            .key(Self::key(key))
            .arg(limit)
            .arg(window.as_secs().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;

        Ok(allowed == 1)
    }

    async fn remaining(&self, key: &str, limit: u32) -> Result<u32, RateLimitError> {
        let mut conn = self.connection.clone();

        let count: Option<u32> = conn.get(Self::key(key)).await.map_err(store_error)?;

        Ok(limit.saturating_sub(count.unwrap_or(0)))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, RateLimitError> {
        let mut conn = self.connection.clone();

        // -2: no key, -1: key without expiry.
        let seconds: i64 = conn.ttl(Self::key(key)).await.map_err(store_error)?;

        Ok(u64::try_from(seconds).ok().map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_redis_fixed_window() {
        let limiter = RedisRateLimiter::connect(&redis_url()).await.unwrap();
        let key = format!("test:{}", uuid::Uuid::new_v4());

        for _ in 0..5 {
            assert!(limiter.allow(&key, 5, Duration::from_secs(60)).await.unwrap());
        }
        assert!(!limiter.allow(&key, 5, Duration::from_secs(60)).await.unwrap());
        assert_eq!(limiter.remaining(&key, 5).await.unwrap(), 0);

        let ttl = limiter.ttl(&key).await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(60));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_redis_concurrent_hits_respect_limit() {
        let limiter = RedisRateLimiter::connect(&redis_url()).await.unwrap();
        let key = format!("test:{}", uuid::Uuid::new_v4());

        let hits: Vec<_> = (0..50)
            .map(|_| {
                let limiter = limiter.clone();
                let key = key.clone();
                tokio::spawn(async move { limiter.allow(&key, 5, Duration::from_secs(60)).await })
            })
            .collect();

        let mut admitted = 0;
        for hit in hits {
            if hit.await.unwrap().unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 5);
    }
}
