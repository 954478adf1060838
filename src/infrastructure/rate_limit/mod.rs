//! Distributed rate-limit state.
//!
//! - [`bucket`] - multi-band token bucket arithmetic
//! - [`BucketStore`] - atomic consume-or-report-wait contract
//! - [`RedisBucketStore`] - shared store used in production
//! - [`MemoryBucketStore`] - in-process store

pub mod bucket;
mod memory_bucket_store;
mod redis_bucket_store;
mod store;

pub use bucket::{Bandwidth, Consumption};
pub use memory_bucket_store::MemoryBucketStore;
pub use redis_bucket_store::RedisBucketStore;
pub use store::{BucketStore, BucketStoreError};

#[cfg(test)]
pub use store::MockBucketStore;
