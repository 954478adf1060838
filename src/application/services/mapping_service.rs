//! Mapping creation and cache-aside resolution.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::clock::Clock;
use crate::domain::entities::Mapping;
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheResult, CacheService};
use crate::utils::code_generator::{CodeGenerator, validate_custom_alias};
use crate::utils::url_validator::validate_long_url;

/// Tunables of [`MappingService`].
#[derive(Debug, Clone)]
pub struct MappingSettings {
    /// Lifetime given to mappings created without an explicit expiry.
    pub default_expiry: TimeDelta,
    /// Furthest an explicit expiry may lie in the future.
    pub max_expiry_horizon: TimeDelta,
    /// TTL of cache entries, refreshed on every cache hit.
    pub cache_ttl: Duration,
    /// Upper bound for every single store or cache round trip.
    pub dependency_timeout: Duration,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            default_expiry: TimeDelta::minutes(1440),
            max_expiry_horizon: TimeDelta::minutes(10080),
            cache_ttl: Duration::from_secs(60 * 60),
            dependency_timeout: Duration::from_millis(500),
        }
    }
}

/// Creates mappings and resolves codes, keeping the cache in front of the store.
///
/// The store is always written first; the cache only receives mappings the store
/// has accepted or returned. Cache failures never fail a request.
pub struct MappingService<R: MappingRepository + ?Sized> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    generator: CodeGenerator,
    clock: Arc<dyn Clock>,
    settings: MappingSettings,
}

impl<R: MappingRepository + ?Sized> MappingService<R> {
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn CacheService>,
        generator: CodeGenerator,
        clock: Arc<dyn Clock>,
        settings: MappingSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            generator,
            clock,
            settings,
        }
    }

    /// Creates a mapping for `long_url`.
    ///
    /// With `custom_alias` the alias becomes the code, otherwise a code is derived
    /// from the URL. Without `expires_at` the mapping expires after the default
    /// expiry.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] for a malformed URL or alias, or an expiry that
    ///   is not in the future or lies beyond the expiry horizon
    /// - [`AppError::AliasTaken`] if the alias is already in use
    /// - [`AppError::DependencyUnavailable`] if the store fails or times out
    /// - [`AppError::Internal`] if no free code could be derived
    pub async fn create(
        &self,
        long_url: &str,
        custom_alias: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Mapping, AppError> {
        validate_long_url(long_url).map_err(|e| {
            AppError::invalid_input("Invalid URL", json!({ "reason": e.to_string() }))
        })?;
        let long_url = long_url.trim();

        let now = self.clock.now();
        let expires_at = self.resolve_expiry(now, expires_at)?;

        let saved = match custom_alias {
            Some(alias) => {
                validate_custom_alias(alias)?;

                // Fast path only; `save` is the authoritative uniqueness check.
                if self.store(self.repository.exists(alias)).await? {
                    return Err(AppError::alias_taken(alias));
                }

                let mapping = Mapping::new(
                    alias.to_string(),
                    long_url.to_string(),
                    now,
                    Some(expires_at),
                );
                self.store(self.repository.save(mapping)).await?
            }
            None => self.save_generated(long_url, now, expires_at).await?,
        };

        debug!("Created mapping {} -> {}", saved.code, saved.long_url);

        if self
            .cached(
                "put",
                self.cache.put(&saved.code, &saved, self.settings.cache_ttl),
            )
            .await
            .is_some()
        {
            debug!("Cached new mapping {}", saved.code);
        }

        Ok(saved)
    }

    /// Looks `code` up, cache first.
    ///
    /// A cache hit slides the entry's TTL. On a miss the store is read and the
    /// cache populated in the background. Expired mappings are returned as-is;
    /// see [`Self::resolve_live`].
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the store has no mapping for `code`
    /// - [`AppError::DependencyUnavailable`] if the store fails or times out
    pub async fn resolve(&self, code: &str) -> Result<Mapping, AppError> {
        if let Some(Some(mapping)) = self.cached("get", self.cache.get(code)).await {
            debug!("Cache hit for {}", code);
            self.cached(
                "refresh_ttl",
                self.cache.refresh_ttl(code, self.settings.cache_ttl),
            )
            .await;
            return Ok(mapping);
        }

        debug!("Cache miss for {}", code);

        let mapping = self
            .store(self.repository.find(code))
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))?;

        self.populate_in_background(mapping.clone());

        Ok(mapping)
    }

    /// Like [`Self::resolve`], but an expired mapping is reported as not found
    /// even if the sweeper has not removed it yet.
    pub async fn resolve_live(&self, code: &str) -> Result<Mapping, AppError> {
        let mapping = self.resolve(code).await?;

        if mapping.is_expired_at(self.clock.now()) {
            debug!("Mapping {} has expired", code);
            return Err(AppError::not_found(
                "Short link not found",
                json!({ "code": code }),
            ));
        }

        Ok(mapping)
    }

    fn resolve_expiry(
        &self,
        now: DateTime<Utc>,
        requested: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>, AppError> {
        let Some(expires_at) = requested else {
            return Ok(now + self.settings.default_expiry);
        };

        if expires_at <= now {
            return Err(AppError::invalid_input(
                "Expiration date must be in the future",
                json!({ "expiration_date": expires_at }),
            ));
        }

        let horizon = now + self.settings.max_expiry_horizon;
        if expires_at > horizon {
            return Err(AppError::invalid_input(
                "Expiration date is too far in the future",
                json!({ "expiration_date": expires_at, "latest_allowed": horizon }),
            ));
        }

        Ok(expires_at)
    }

    /// Tries up to `max_attempts` candidate codes in order. A candidate that is
    /// taken, whether seen by `exists` or lost at `save`, uses up one attempt.
    async fn save_generated(
        &self,
        long_url: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Mapping, AppError> {
        let max_attempts = self.generator.max_attempts();

        for (attempt, code) in self
            .generator
            .candidates(long_url)
            .take(max_attempts)
            .enumerate()
        {
            if self.store(self.repository.exists(&code)).await? {
                debug!("Code collision on {} (attempt {})", code, attempt + 1);
                continue;
            }

            let mapping = Mapping::new(code, long_url.to_string(), now, Some(expires_at));

            match self.store(self.repository.save(mapping)).await {
                // Another request claimed the code between the check and the insert.
                Err(AppError::AliasTaken { details, .. }) => {
                    debug!("Lost race for generated code: {}", details);
                }
                other => return other,
            }
        }

        Err(AppError::internal(
            "Failed to generate unique code",
            json!({ "reason": "Too many collisions", "attempts": max_attempts }),
        ))
    }

    fn populate_in_background(&self, mapping: Mapping) {
        let cache = Arc::clone(&self.cache);
        let ttl = self.settings.cache_ttl;
        let limit = self.settings.dependency_timeout;

        tokio::spawn(async move {
            match timeout(limit, cache.put(&mapping.code, &mapping, ttl)).await {
                Ok(Ok(())) => debug!("Cached mapping {}", mapping.code),
                Ok(Err(e)) => warn!("Failed to cache mapping {}: {}", mapping.code, e),
                Err(_) => warn!("Cache put for {} timed out", mapping.code),
            }
        });
    }

    /// Runs a store call under the dependency timeout.
    async fn store<T>(
        &self,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        timeout(self.settings.dependency_timeout, call)
            .await
            .map_err(|_| {
                AppError::unavailable(
                    "Store timed out",
                    json!({ "timeout_ms": self.settings.dependency_timeout.as_millis() as u64 }),
                )
            })?
    }

    /// Runs a cache call under the dependency timeout; failures become `None`.
    async fn cached<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = CacheResult<T>>,
    ) -> Option<T> {
        match timeout(self.settings.dependency_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!("Cache {} failed: {}", op, e);
                None
            }
            Err(_) => {
                warn!("Cache {} timed out", op);
                None
            }
        }
    }
}
