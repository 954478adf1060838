//! Repository trait for mapping persistence (the durable store).

use crate::domain::entities::Mapping;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable store of mappings, keyed by short code.
///
/// The store is the source of truth. Implementations must make [`save`] an atomic
/// insert-if-absent: of two concurrent saves for the same code exactly one wins.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgMappingRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::InMemoryMappingRepository`] - process-local store
/// - Test mocks available with `cfg(test)`
///
/// [`save`]: MappingRepository::save
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Finds a mapping by code, expired or not.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::DependencyUnavailable`] or [`AppError::Internal`] on store errors.
    async fn find(&self, code: &str) -> Result<Option<Mapping>, AppError>;

    /// Inserts a mapping if its code is not taken.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AliasTaken`] if a mapping with the same code already exists.
    async fn save(&self, mapping: Mapping) -> Result<Mapping, AppError>;

    /// Returns true if any mapping (live or expired) holds `code`.
    async fn exists(&self, code: &str) -> Result<bool, AppError>;

    /// Returns every mapping whose `expires_at` is before `now`.
    async fn find_all_expired(&self, now: DateTime<Utc>) -> Result<Vec<Mapping>, AppError>;

    /// Deletes the mappings with the given codes and returns how many were removed.
    ///
    /// Codes that are already gone are skipped silently.
    async fn delete_batch(&self, codes: &[String]) -> Result<u64, AppError>;

    /// Returns true if the store answers.
    async fn health_check(&self) -> bool;
}
