//! No-op cache implementation for disabled caching.

use super::service::{CacheResult, CacheService};
use crate::domain::entities::Link;
use async_trait::async_trait;
use tracing::debug;

/// A cache that never stores anything.
///
/// Used when `REDIS_URL` is unset, when Redis is unreachable at startup, and in
/// tests.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get_link(&self, _code: &str) -> CacheResult<Option<Link>> {
        Ok(None)
    }

    async fn set_link(&self, _code: &str, _link: &Link, _ttl: Option<u64>) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
