//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use crate::domain::entities::Link;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, info, warn};

/// Link cache in Redis, stored as JSON under `link:<code>`.
///
/// Uses `ConnectionManager` for automatic reconnection. All operations are
/// fail-open: errors are logged and never reach the caller.
pub struct RedisCache {
    client: ConnectionManager,
    default_ttl: u64,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and verifies the connection with a PING.
    ///
    /// `default_ttl_seconds` applies when [`CacheService::set_link`] is called
    /// without a TTL (`CACHE_TTL_SECONDS`).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING fails.
    pub async fn connect(redis_url: &str, default_ttl_seconds: u64) -> CacheResult<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {e}"))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {e}"))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {e}")))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl: default_ttl_seconds.max(1),
            key_prefix: "link:".to_string(),
        })
    }

    fn build_key(&self, code: &str) -> String {
        format!("{}{}", self.key_prefix, code)
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_link(&self, code: &str) -> CacheResult<Option<Link>> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        let raw = match conn.get::<_, Option<String>>(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(code, error = %e, "Redis GET failed");
                return Ok(None);
            }
        };

        let Some(raw) = raw else {
            debug!(code, "Cache MISS");
            return Ok(None);
        };

        match serde_json::from_str::<Link>(&raw) {
            Ok(link) => {
                debug!(code, link_id = link.id, "Cache HIT");
                Ok(Some(link))
            }
            Err(e) => {
                warn!(code, error = %e, "Discarding undecodable cache entry");
                let _ = conn.del::<_, i32>(&key).await;
                Ok(None)
            }
        }
    }

    async fn set_link(&self, code: &str, link: &Link, ttl: Option<u64>) -> CacheResult<()> {
        let key = self.build_key(code);
        let ttl_seconds = ttl.unwrap_or(self.default_ttl);

        let payload = match serde_json::to_string(link) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(code, error = %e, "Failed to encode link for cache");
                return Ok(());
            }
        };

        let mut conn = self.client.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(&key, payload, ttl_seconds).await {
            warn!(code, error = %e, "Redis SET failed");
        } else {
            debug!(code, ttl_seconds, "Cache SET");
        }
        Ok(())
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        if let Err(e) = conn.del::<_, i32>(&key).await {
            warn!(code, error = %e, "Redis DEL failed");
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
