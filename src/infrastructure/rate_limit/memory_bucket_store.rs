//! Single-process bucket store.

use super::bucket::{Bandwidth, BucketState, Consumption, idle_ttl};
use super::store::{BucketStore, BucketStoreError};
use crate::domain::clock::Clock;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Every this many operations, idle buckets are evicted.
const EVICT_EVERY: u64 = 1024;

#[derive(Debug)]
struct Slot {
    state: BucketState,
    expires_at_ms: i64,
}

/// Bucket store kept in process memory.
///
/// Updates run under the map's per-shard lock, so each `try_consume` is atomic.
/// It does not coordinate across instances; use it for single-node deployments
/// and tests.
pub struct MemoryBucketStore {
    buckets: DashMap<String, Slot>,
    clock: Arc<dyn Clock>,
    ops: AtomicU64,
}

impl MemoryBucketStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
            ops: AtomicU64::new(0),
        }
    }

    /// Number of buckets held, including idle ones not yet evicted.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drops every bucket whose idle lifetime has run out.
    pub fn evict_idle(&self) {
        let now_ms = self.clock.now().timestamp_millis();
        let before = self.buckets.len();
        self.buckets.retain(|_, slot| slot.expires_at_ms > now_ms);
        debug!(
            "Evicted {} idle buckets",
            before.saturating_sub(self.buckets.len())
        );
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn try_consume(
        &self,
        key: &str,
        limits: &[Bandwidth],
    ) -> Result<Consumption, BucketStoreError> {
        if self.ops.fetch_add(1, Ordering::Relaxed) % EVICT_EVERY == EVICT_EVERY - 1 {
            self.evict_idle();
        }

        let now_ms = self.clock.now().timestamp_millis();
        let ttl_ms = idle_ttl(limits).as_millis() as i64;

        let mut slot = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Slot {
                state: BucketState::full(limits, now_ms),
                expires_at_ms: now_ms + ttl_ms,
            });

        if slot.expires_at_ms <= now_ms {
            slot.state = BucketState::full(limits, now_ms);
        }

        let outcome = slot.state.try_consume(limits, now_ms);
        slot.expires_at_ms = now_ms + ttl_ms;

        Ok(outcome)
    }
}
