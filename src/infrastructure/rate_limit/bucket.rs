//! Token bucket arithmetic with several bandwidths per bucket.
//!
//! A bucket carries one band per configured [`Bandwidth`]. A token is taken only if
//! every band has one, and then it is taken from all of them, so a request never
//! leaves one band drained while another refuses it.
//!
//! Refill is interval based: once a full `refill_period` has elapsed since the last
//! refill, the band is topped up to `capacity` in one step.
//!
//! [`crate::infrastructure::rate_limit::RedisBucketStore`] runs the same algorithm
//! as a Lua script; keep the two in step.

use std::time::Duration;

/// Extra lifetime given to idle bucket state beyond the longest refill period.
pub const IDLE_GRACE: Duration = Duration::from_secs(10);

/// One limit enforced by a bucket: `capacity` tokens every `refill_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bandwidth {
    pub capacity: u64,
    pub refill_period: Duration,
}

impl Bandwidth {
    pub fn new(capacity: u64, refill_period: Duration) -> Self {
        Self {
            capacity,
            refill_period,
        }
    }

    fn period_ms(&self) -> i64 {
        (self.refill_period.as_millis() as i64).max(1)
    }
}

/// Outcome of a consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumption {
    pub consumed: bool,
    /// Tokens left in the most constrained band.
    pub remaining: u64,
    /// Time until a token is available in every band; zero when consumed.
    pub retry_after: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Band {
    tokens: u64,
    last_refill_ms: i64,
}

/// Mutable state of one client's bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketState {
    bands: Vec<Band>,
}

impl BucketState {
    /// A bucket with every band at capacity.
    pub fn full(limits: &[Bandwidth], now_ms: i64) -> Self {
        Self {
            bands: limits
                .iter()
                .map(|l| Band {
                    tokens: l.capacity,
                    last_refill_ms: now_ms,
                })
                .collect(),
        }
    }

    /// Refills due bands, then takes one token from every band if all have one.
    pub fn try_consume(&mut self, limits: &[Bandwidth], now_ms: i64) -> Consumption {
        if self.bands.len() != limits.len() {
            *self = Self::full(limits, now_ms);
        }

        for (band, limit) in self.bands.iter_mut().zip(limits) {
            let period = limit.period_ms();
            let elapsed = now_ms - band.last_refill_ms;
            if elapsed >= period {
                band.tokens = limit.capacity;
                band.last_refill_ms += (elapsed / period) * period;
            }
        }

        let consumed = self.bands.iter().all(|b| b.tokens >= 1);
        let mut retry_after_ms = 0i64;

        if consumed {
            for band in &mut self.bands {
                band.tokens -= 1;
            }
        } else {
            for (band, limit) in self.bands.iter().zip(limits) {
                if band.tokens == 0 {
                    let wait = band.last_refill_ms + limit.period_ms() - now_ms;
                    retry_after_ms = retry_after_ms.max(wait);
                }
            }
        }

        Consumption {
            consumed,
            remaining: self.bands.iter().map(|b| b.tokens).min().unwrap_or(0),
            retry_after: Duration::from_millis(retry_after_ms.max(0) as u64),
        }
    }
}

/// How long unused bucket state must be kept: by then every band would be full again.
pub fn idle_ttl(limits: &[Bandwidth]) -> Duration {
    limits
        .iter()
        .map(|l| l.refill_period)
        .max()
        .unwrap_or_default()
        + IDLE_GRACE
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE_MS: i64 = 60_000;

    fn sustained_and_burst() -> Vec<Bandwidth> {
        vec![
            Bandwidth::new(5, Duration::from_secs(60)),
            Bandwidth::new(2, Duration::from_secs(1)),
        ]
    }

    #[test]
    fn test_single_band_denies_when_empty_and_refills_after_period() {
        let limits = [Bandwidth::new(2, Duration::from_secs(60))];
        let mut state = BucketState::full(&limits, 0);

        assert!(state.try_consume(&limits, 0).consumed);
        assert!(state.try_consume(&limits, 10).consumed);

        let denied = state.try_consume(&limits, 20);
        assert!(!denied.consumed);
        assert_eq!(denied.retry_after, Duration::from_millis(59_980));

        assert!(state.try_consume(&limits, MINUTE_MS + 1).consumed);
    }

    #[test]
    fn test_burst_band_limits_before_sustained() {
        let limits = sustained_and_burst();
        let mut state = BucketState::full(&limits, 0);

        assert!(state.try_consume(&limits, 0).consumed);
        assert!(state.try_consume(&limits, 0).consumed);

        let denied = state.try_consume(&limits, 100);
        assert!(!denied.consumed);
        assert_eq!(denied.retry_after, Duration::from_millis(900));
    }

    #[test]
    fn test_denial_does_not_drain_other_bands() {
        let limits = sustained_and_burst();
        let mut state = BucketState::full(&limits, 0);

        state.try_consume(&limits, 0);
        state.try_consume(&limits, 0);
        for _ in 0..10 {
            assert!(!state.try_consume(&limits, 500).consumed);
        }

        // Burst refilled; sustained still holds the 3 tokens the denials did not touch.
        let outcome = state.try_consume(&limits, 1_000);
        assert!(outcome.consumed);
        assert_eq!(outcome.remaining, 1);
        assert_eq!(state.bands[0].tokens, 2);
    }

    #[test]
    fn test_sustained_band_reports_longest_wait() {
        let limits = sustained_and_burst();
        let mut state = BucketState::full(&limits, 0);

        // Spread requests so the burst band keeps refilling.
        for i in 0..5 {
            assert!(state.try_consume(&limits, i * 1_000).consumed);
        }

        let denied = state.try_consume(&limits, 5_000);
        assert!(!denied.consumed);
        assert_eq!(denied.retry_after, Duration::from_millis(55_000));
    }

    #[test]
    fn test_refill_keeps_period_alignment() {
        let limits = [Bandwidth::new(1, Duration::from_secs(60))];
        let mut state = BucketState::full(&limits, 0);

        state.try_consume(&limits, 0);
        // Two and a half periods later the next boundary is at 180s.
        state.try_consume(&limits, 150_000);

        let denied = state.try_consume(&limits, 150_001);
        assert_eq!(denied.retry_after, Duration::from_millis(29_999));
    }

    #[test]
    fn test_changed_limits_reset_state() {
        let limits = [Bandwidth::new(1, Duration::from_secs(60))];
        let mut state = BucketState::full(&limits, 0);
        state.try_consume(&limits, 0);

        let widened = sustained_and_burst();
        assert!(state.try_consume(&widened, 1).consumed);
    }

    #[test]
    fn test_idle_ttl_uses_longest_period() {
        assert_eq!(
            idle_ttl(&sustained_and_burst()),
            Duration::from_secs(60) + IDLE_GRACE
        );
    }
}
