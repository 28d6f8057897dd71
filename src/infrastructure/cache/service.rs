//! Cache service trait and error types.

use async_trait::async_trait;

use crate::domain::entities::Link;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Read-through cache of links keyed by the code or alias they were requested with.
///
/// Implementations are fail-open: backend errors are logged and reported as a
/// miss so the resolver falls back to the database.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the cached link, or `Ok(None)` on a miss.
    async fn get_link(&self, code: &str) -> CacheResult<Option<Link>>;

    /// Stores a link. `ttl_seconds = None` uses the implementation default.
    async fn set_link(&self, code: &str, link: &Link, ttl_seconds: Option<u64>) -> CacheResult<()>;

    /// Drops a cached link.
    async fn invalidate(&self, code: &str) -> CacheResult<()>;

    /// Used by the health endpoint.
    async fn health_check(&self) -> bool;
}
