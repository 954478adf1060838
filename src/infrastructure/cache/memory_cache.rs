//! Process-local cache with per-entry TTL.

use super::service::{CacheResult, CacheService};
use crate::domain::entities::Mapping;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    mapping: Mapping,
    expires_at: Instant,
}

/// In-memory cache backed by a sharded map.
///
/// Entries lapse after their TTL; lapsed entries are dropped lazily on access.
/// Not shared between instances, so it suits single-node deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, lapsed ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, code: &str) -> CacheResult<Option<Mapping>> {
        let now = Instant::now();

        let Some(entry) = self.entries.get(code) else {
            debug!("Cache MISS: {}", code);
            return Ok(None);
        };

        if entry.expires_at <= now {
            drop(entry);
            self.entries.remove_if(code, |_, e| e.expires_at <= now);
            debug!("Cache MISS (lapsed): {}", code);
            return Ok(None);
        }

        debug!("Cache HIT: {}", code);
        Ok(Some(entry.mapping.clone()))
    }

    async fn put(&self, code: &str, mapping: &Mapping, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            code.to_string(),
            Entry {
                mapping: mapping.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn refresh_ttl(&self, code: &str, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        if let Some(mut entry) = self.entries.get_mut(code)
            && entry.expires_at > now
        {
            entry.expires_at = now + ttl;
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
