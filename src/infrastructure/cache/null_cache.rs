//! No-op cache implementation for testing or disabled caching.

use super::service::{CacheResult, CacheService};
use crate::domain::entities::Mapping;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Used when Redis is not configured or caching is explicitly disabled.
/// Every lookup is a miss, so all reads go to the store.
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
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
    async fn get(&self, _code: &str) -> CacheResult<Option<Mapping>> {
        Ok(None)
    }

    async fn put(&self, _code: &str, _mapping: &Mapping, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn refresh_ttl(&self, _code: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
