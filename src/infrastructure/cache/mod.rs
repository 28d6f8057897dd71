//! Short-lived cache of resolved links, consulted before PostgreSQL on every redirect.
//!
//! [`RedisCache`] is used when Redis is configured; [`NullCache`] otherwise and in tests.

mod null_cache;
mod redis_cache;
mod service;

pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, CacheService};
