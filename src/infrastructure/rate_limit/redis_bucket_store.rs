//! Redis-backed bucket store shared across service instances.

use super::bucket::{Bandwidth, Consumption, idle_ttl};
use super::store::{BucketStore, BucketStoreError};
use async_trait::async_trait;
use redis::{Script, aio::ConnectionManager};
use std::time::Duration;
use tracing::trace;

/// Refill-and-consume as one server-side script, so every instance sees an
/// atomic update. Time comes from the Redis server to avoid clock skew between
/// instances.
///
/// KEYS[1]  bucket key
/// ARGV[1]  number of bands n
/// ARGV[2]  idle TTL in milliseconds
/// ARGV[1 + 2i], ARGV[2 + 2i]  capacity and refill period (ms) of band i
///
/// Returns {consumed (0/1), remaining, retry_after_ms}.
const CONSUME_SCRIPT: &str = r#"
local key = KEYS[1]
local n = tonumber(ARGV[1])
local ttl_ms = tonumber(ARGV[2])
local t = redis.call('TIME')
local now = tonumber(t[1]) * 1000 + math.floor(tonumber(t[2]) / 1000)

local raw = redis.call('HGETALL', key)
local fields = {}
for i = 1, #raw, 2 do
  fields[raw[i]] = tonumber(raw[i + 1])
end

local fresh = fields['n'] ~= n
local tokens, last = {}, {}
for i = 1, n do
  local cap = tonumber(ARGV[1 + 2 * i])
  local period = tonumber(ARGV[2 + 2 * i])
  if fresh or fields['t' .. i] == nil then
    tokens[i] = cap
    last[i] = now
  else
    tokens[i] = fields['t' .. i]
    last[i] = fields['r' .. i]
    local elapsed = now - last[i]
    if elapsed >= period then
      tokens[i] = cap
      last[i] = last[i] + math.floor(elapsed / period) * period
    end
  end
end

local consumed = 1
for i = 1, n do
  if tokens[i] < 1 then
    consumed = 0
  end
end

local retry = 0
local remaining = -1
for i = 1, n do
  if consumed == 1 then
    tokens[i] = tokens[i] - 1
  elseif tokens[i] < 1 then
    local wait = last[i] + tonumber(ARGV[2 + 2 * i]) - now
    if wait > retry then
      retry = wait
    end
  end
  if remaining < 0 or tokens[i] < remaining then
    remaining = tokens[i]
  end
end

local args = {'n', n}
for i = 1, n do
  table.insert(args, 't' .. i)
  table.insert(args, tokens[i])
  table.insert(args, 'r' .. i)
  table.insert(args, last[i])
end
redis.call('HSET', key, unpack(args))
redis.call('PEXPIRE', key, ttl_ms)

return {consumed, remaining, retry}
"#;

/// Token buckets stored as Redis hashes under `rl:{key}`.
pub struct RedisBucketStore {
    client: ConnectionManager,
    script: Script,
    key_prefix: String,
}

impl RedisBucketStore {
    pub fn new(client: ConnectionManager) -> Self {
        Self {
            client,
            script: Script::new(CONSUME_SCRIPT),
            key_prefix: "rl:".to_string(),
        }
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl BucketStore for RedisBucketStore {
    async fn try_consume(
        &self,
        key: &str,
        limits: &[Bandwidth],
    ) -> Result<Consumption, BucketStoreError> {
        let redis_key = self.build_key(key);
        let mut conn = self.client.clone();

        let mut invocation = self.script.key(&redis_key);
        invocation
            .arg(limits.len())
            .arg(idle_ttl(limits).as_millis() as u64);
        for limit in limits {
            invocation
                .arg(limit.capacity)
                .arg(limit.refill_period.as_millis() as u64);
        }

        let (consumed, remaining, retry_ms): (i64, i64, i64) = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                if e.is_io_error() || e.is_timeout() || e.is_connection_dropped() {
                    BucketStoreError::Unavailable(e.to_string())
                } else {
                    BucketStoreError::Protocol(e.to_string())
                }
            })?;

        trace!(
            "Bucket {}: consumed={} remaining={} retry_ms={}",
            redis_key, consumed, remaining, retry_ms
        );

        Ok(Consumption {
            consumed: consumed == 1,
            remaining: remaining.max(0) as u64,
            retry_after: Duration::from_millis(retry_ms.max(0) as u64),
        })
    }
}
