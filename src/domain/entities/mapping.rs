//! Mapping entity: a short code bound to a long URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short code to long URL mapping.
///
/// `code` is unique across the store and never changes after creation. Liveness is
/// a read-time property: a mapping whose `expires_at` has passed is treated as
/// absent even while it still sits in the store waiting for the sweeper.
///
/// `hit_count` is persisted but no operation increments it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub code: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hit_count: i64,
}

impl Mapping {
    /// Creates a new mapping with a zero hit count.
    pub fn new(
        code: String,
        long_url: String,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            code,
            long_url,
            created_at,
            expires_at,
            hit_count: 0,
        }
    }

    /// Returns true if the mapping is live at `now`.
    ///
    /// A mapping without an expiry never expires; otherwise it is live strictly
    /// before `expires_at`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|e| now < e)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_live_at(now)
    }
}
