//! Periodic removal of expired mappings from the store.
//!
//! Sweeping is cleanup only. Reads check liveness on their own, so a late or
//! failed sweep never makes an expired mapping resolvable. Cache entries are left
//! to lapse through their TTL.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info};

use crate::domain::clock::Clock;
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;

/// Counters kept across sweeps.
#[derive(Debug, Default)]
pub struct SweepStats {
    runs: AtomicU64,
    failures: AtomicU64,
    deleted: AtomicU64,
}

impl SweepStats {
    /// Sweeps started, failed ones included.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Mappings deleted over all sweeps.
    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }
}

pub struct ExpirySweeper {
    repository: Arc<dyn MappingRepository>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    stats: Arc<SweepStats>,
}

impl ExpirySweeper {
    /// `timeout` bounds each store call of a sweep.
    pub fn new(
        repository: Arc<dyn MappingRepository>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            repository,
            clock,
            timeout,
            stats: Arc::new(SweepStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SweepStats> {
        Arc::clone(&self.stats)
    }

    /// Deletes every mapping that expired before now and returns how many went.
    ///
    /// # Errors
    ///
    /// Returns the store error if the lookup or the delete fails. Nothing is
    /// retried; the next sweep picks up whatever is left.
    pub async fn sweep_once(&self) -> Result<u64, AppError> {
        self.stats.runs.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("expiry_sweeps_total").increment(1);

        let result = self.sweep().await;

        match &result {
            Ok(deleted) => {
                self.stats.deleted.fetch_add(*deleted, Ordering::Relaxed);
                metrics::counter!("expired_mappings_deleted_total").increment(*deleted);
            }
            Err(_) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("expiry_sweep_failures_total").increment(1);
            }
        }

        result
    }

    async fn sweep(&self) -> Result<u64, AppError> {
        let now = self.clock.now();

        let expired = self.bounded(self.repository.find_all_expired(now)).await?;
        if expired.is_empty() {
            debug!("No expired mappings");
            return Ok(0);
        }

        let codes: Vec<String> = expired.into_iter().map(|m| m.code).collect();
        info!("Found {} expired mappings", codes.len());

        let deleted = self.bounded(self.repository.delete_batch(&codes)).await?;
        info!("Deleted {} expired mappings", deleted);

        Ok(deleted)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        timeout(self.timeout, call).await.map_err(|_| {
            AppError::unavailable(
                "Store timed out during sweep",
                json!({ "timeout_ms": self.timeout.as_millis() as u64 }),
            )
        })?
    }

    /// Runs [`Self::sweep_once`] every `period` until `shutdown` turns true or
    /// its sender is dropped.
    ///
    /// The first sweep starts right away. Sweeps never overlap: a sweep that
    /// overruns the period delays the next one instead of stacking up.
    pub fn spawn(self, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!("Expiry sweeper started (every {:?})", period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep_once().await {
                            error!("Expiry sweep failed: {}", e);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!(
                "Expiry sweeper stopped after {} runs ({} failed, {} mappings deleted)",
                self.stats.runs(),
                self.stats.failures(),
                self.stats.deleted()
            );
        })
    }
}
