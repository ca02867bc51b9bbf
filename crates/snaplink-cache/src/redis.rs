use async_trait::async_trait;
use redis::AsyncCommands;
use snaplink_core::cache::Result;
use snaplink_core::{CacheError, ShortCode, ShortLink, UrlCache};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Key prefix used when none is given.
pub const DEFAULT_KEY_PREFIX: &str = "snaplink:url:";

/// A Redis-based implementation of [`UrlCache`].
///
/// Links are stored as JSON strings under `<prefix><short code>` with a
/// server-side expiry. Redis expiries have second granularity, so TTLs are
/// rounded up to at least one second.
#[derive(Debug, Clone)]
pub struct RedisUrlCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else if err.is_io_error() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

fn expiry_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

impl RedisUrlCache {
    /// Creates a new Redis URL cache using [`DEFAULT_KEY_PREFIX`].
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a new Redis URL cache with a custom key prefix.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    /// * `key_prefix` - Custom prefix for cache keys (e.g., "myapp:url:")
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a multiplexed connection to `url` and wraps it.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Initialization(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Initialization(format!("failed to connect to redis: {e}")))?;

        Ok(Self::with_prefix(conn, key_prefix))
    }

    /// Generates the cache key for a short code.
    fn cache_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.key_prefix, code.as_str())
    }
}

#[async_trait]
impl UrlCache for RedisUrlCache {
    async fn get_link(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        let key = self.cache_key(code);
        trace!(code = %code, "Fetching link from Redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(cached)) => {
                debug!(code = %code, "Cache hit in Redis");
                match serde_json::from_str::<ShortLink>(&cached) {
                    Ok(link) => Ok(Some(link)),
                    Err(e) => {
                        warn!(code = %code, error = %e, "Failed to deserialize cached link");
                        Err(CacheError::InvalidData(format!(
                            "invalid cached value for key '{key}': {e}"
                        )))
                    }
                }
            }
            Ok(None) => {
                trace!(code = %code, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn set_link(&self, code: &ShortCode, link: &ShortLink, ttl: Duration) -> Result<()> {
        let key = self.cache_key(code);
        trace!(code = %code, "Storing link in Redis cache");

        let json = match serde_json::to_string(link) {
            Ok(json) => json,
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to serialize link for caching");
                return Err(CacheError::Serialization(format!(
                    "failed to serialize cache value: {e}"
                )));
            }
        };

        let mut conn = self.conn.clone();
        match conn
            .set_ex::<_, _, ()>(&key, json, expiry_seconds(ttl))
            .await
        {
            Ok(()) => {
                debug!(code = %code, "Cached link in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to cache link in Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = self.cache_key(code);
        trace!(code = %code, "Removing link from Redis cache");

        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(&key).await {
            Ok(()) => {
                debug!(code = %code, "Removed link from Redis cache");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to remove link from Redis cache");
                Err(map_redis_error("failed to delete value from Redis", e))
            }
        }
    }
}
