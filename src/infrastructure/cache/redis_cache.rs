//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use crate::domain::entities::Mapping;
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::time::Duration;
use tracing::debug;

/// Redis cache shared by every service instance.
///
/// Mappings are stored as JSON under `url:{code}` with `SET EX`; sliding
/// expiration is an `EXPIRE` on hit.
pub struct RedisCache {
    client: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Wraps an established connection manager.
    pub fn new(client: ConnectionManager) -> Self {
        Self {
            client,
            key_prefix: "url:".to_string(),
        }
    }

    /// Constructs the full Redis key with namespace prefix.
    fn build_key(&self, code: &str) -> String {
        format!("{}{}", self.key_prefix, code)
    }
}

/// Opens a connection manager and checks it with a PING.
///
/// Shared by the cache and the rate-limit bucket store, which talk to the same Redis.
pub async fn connect_manager(redis_url: &str) -> CacheResult<ConnectionManager> {
    let client = redis::Client::open(redis_url).map_err(|e| {
        CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
    })?;

    let manager = ConnectionManager::new(client)
        .await
        .map_err(|e| CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e)))?;

    let mut test_conn = manager.clone();
    test_conn
        .ping::<()>()
        .await
        .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

    Ok(manager)
}

fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, code: &str) -> CacheResult<Option<Mapping>> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| CacheError::OperationError(format!("GET {}: {}", key, e)))?;

        match raw {
            Some(json) => {
                debug!("Cache HIT: {}", code);
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => {
                debug!("Cache MISS: {}", code);
                Ok(None)
            }
        }
    }

    async fn put(&self, code: &str, mapping: &Mapping, ttl: Duration) -> CacheResult<()> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();
        let json = serde_json::to_string(mapping)?;
        let secs = ttl_seconds(ttl);

        conn.set_ex::<_, _, ()>(&key, json, secs)
            .await
            .map_err(|e| CacheError::OperationError(format!("SET {}: {}", key, e)))?;

        debug!("Cache SET: {} -> {} (TTL: {}s)", code, mapping.long_url, secs);
        Ok(())
    }

    async fn refresh_ttl(&self, code: &str, ttl: Duration) -> CacheResult<()> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        let refreshed: bool = conn
            .expire(&key, ttl_seconds(ttl) as i64)
            .await
            .map_err(|e| CacheError::OperationError(format!("EXPIRE {}: {}", key, e)))?;

        if refreshed {
            debug!("Cache TTL refreshed: {}", code);
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
