//! Cache service trait and error types.

use crate::domain::entities::Mapping;
use async_trait::async_trait;
use std::time::Duration;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
    #[error("Cache serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Volatile, TTL-bearing projection of the mapping store.
///
/// The cache only ever receives mappings that the store has accepted or returned.
/// Errors are returned to the caller, which treats them as misses; a failing cache
/// degrades to store lookups and never fails a request on its own.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache shared by all instances
/// - [`crate::infrastructure::cache::MemoryCache`] - process-local cache
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Retrieves the mapping cached under `code`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(mapping))` on cache hit
    /// - `Ok(None)` on cache miss
    async fn get(&self, code: &str) -> CacheResult<Option<Mapping>>;

    /// Stores `mapping` under `code` for `ttl`, replacing any previous entry.
    async fn put(&self, code: &str, mapping: &Mapping, ttl: Duration) -> CacheResult<()>;

    /// Resets the remaining lifetime of an existing entry to `ttl`.
    ///
    /// Missing entries are left missing.
    async fn refresh_ttl(&self, code: &str, ttl: Duration) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
