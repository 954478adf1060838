//! Distributed rate limiting for the write path.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::infrastructure::rate_limit::{Bandwidth, BucketStore};

/// Verdict of [`RateLimiter::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u64 },
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// What to do when the bucket store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Let the request through, unlimited.
    Open,
    /// Reject the request with [`AppError::DependencyUnavailable`].
    #[default]
    Closed,
}

/// Token bucket gate keyed by client identity.
///
/// Every key has one bucket enforcing all configured bandwidths at once. Bucket
/// state lives in a [`BucketStore`], so all instances sharing the store enforce
/// the same limits.
pub struct RateLimiter {
    store: Arc<dyn BucketStore>,
    limits: Vec<Bandwidth>,
    policy: FailurePolicy,
    timeout: Duration,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn BucketStore>,
        limits: Vec<Bandwidth>,
        policy: FailurePolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            limits,
            policy,
            timeout,
        }
    }

    /// The sustained + burst pair used by the service.
    pub fn sustained_and_burst(
        sustained_capacity: u64,
        sustained_refill: Duration,
        burst_capacity: u64,
        burst_refill: Duration,
    ) -> Vec<Bandwidth> {
        vec![
            Bandwidth::new(sustained_capacity, sustained_refill),
            Bandwidth::new(burst_capacity, burst_refill),
        ]
    }

    /// Takes one token for `key`.
    ///
    /// A denial has no side effect on the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::DependencyUnavailable`] if the store is unreachable and
    /// the policy is [`FailurePolicy::Closed`]. Under [`FailurePolicy::Open`] the
    /// request is allowed instead.
    pub async fn admit(&self, key: &str) -> Result<Admission, AppError> {
        let failure = match timeout(self.timeout, self.store.try_consume(key, &self.limits)).await
        {
            Ok(Ok(outcome)) if outcome.consumed => {
                debug!("Admitted {} ({} tokens left)", key, outcome.remaining);
                return Ok(Admission::Allowed {
                    remaining: outcome.remaining,
                });
            }
            Ok(Ok(outcome)) => {
                debug!("Denied {} for {:?}", key, outcome.retry_after);
                metrics::counter!("rate_limit_denied_total").increment(1);
                return Ok(Admission::Denied {
                    retry_after: outcome.retry_after,
                });
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no reply within {}ms", self.timeout.as_millis()),
        };

        metrics::counter!("rate_limit_store_failures_total").increment(1);

        match self.policy {
            FailurePolicy::Open => {
                warn!("Rate limiter failing open for {}: {}", key, failure);
                Ok(Admission::Allowed { remaining: 0 })
            }
            FailurePolicy::Closed => {
                warn!("Rate limiter failing closed for {}: {}", key, failure);
                Err(AppError::unavailable(
                    "Rate limiter unavailable",
                    json!({ "reason": failure }),
                ))
            }
        }
    }
}
