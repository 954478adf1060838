//! Shared bucket store contract.

use super::bucket::{Bandwidth, Consumption};
use async_trait::async_trait;

/// Errors that can occur while talking to the bucket store.
#[derive(Debug, thiserror::Error)]
pub enum BucketStoreError {
    #[error("Bucket store unavailable: {0}")]
    Unavailable(String),
    #[error("Bucket store returned an unexpected reply: {0}")]
    Protocol(String),
}

/// Holds token bucket state shared by every service instance.
///
/// `try_consume` must be atomic per key: concurrent callers for the same key
/// observe each other's consumption, and no caller sees a partially updated
/// bucket. Unused bucket state expires on its own.
///
/// # Implementations
///
/// - [`crate::infrastructure::rate_limit::RedisBucketStore`] - Redis + Lua, shared across instances
/// - [`crate::infrastructure::rate_limit::MemoryBucketStore`] - single-process store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Consumes one token from the bucket at `key` if every limit allows it.
    async fn try_consume(
        &self,
        key: &str,
        limits: &[Bandwidth],
    ) -> Result<Consumption, BucketStoreError>;
}
