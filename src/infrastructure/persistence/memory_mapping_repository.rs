//! In-memory implementation of the mapping repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::entities::Mapping;
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;

/// Process-local mapping store using DashMap.
///
/// `save` goes through the map's entry API, which holds the shard lock for the
/// check and the insert, so it is an atomic insert-if-absent like the SQL store.
/// Expired entries stay until deleted, matching the durable store's behaviour.
#[derive(Debug, Default)]
pub struct InMemoryMappingRepository {
    storage: DashMap<String, Mapping>,
}

impl InMemoryMappingRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl MappingRepository for InMemoryMappingRepository {
    async fn find(&self, code: &str) -> Result<Option<Mapping>, AppError> {
        Ok(self.storage.get(code).map(|m| m.clone()))
    }

    async fn save(&self, mapping: Mapping) -> Result<Mapping, AppError> {
        match self.storage.entry(mapping.code.clone()) {
            Entry::Occupied(_) => Err(AppError::alias_taken(&mapping.code)),
            Entry::Vacant(slot) => {
                slot.insert(mapping.clone());
                Ok(mapping)
            }
        }
    }

    async fn exists(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.storage.contains_key(code))
    }

    async fn find_all_expired(&self, now: DateTime<Utc>) -> Result<Vec<Mapping>, AppError> {
        Ok(self
            .storage
            .iter()
            .filter(|m| m.expires_at.is_some_and(|e| e < now))
            .map(|m| m.clone())
            .collect())
    }

    async fn delete_batch(&self, codes: &[String]) -> Result<u64, AppError> {
        Ok(codes
            .iter()
            .filter(|code| self.storage.remove(code.as_str()).is_some())
            .count() as u64)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn mapping(code: &str, expires_at: Option<DateTime<Utc>>) -> Mapping {
        Mapping::new(
            code.to_string(),
            format!("https://example.com/{code}"),
            Utc::now(),
            expires_at,
        )
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryMappingRepository::new();
        repo.save(mapping("abc123", None)).await.unwrap();

        let found = repo.find("abc123").await.unwrap().unwrap();
        assert_eq!(found.long_url, "https://example.com/abc123");
        assert!(repo.exists("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_conflict_keeps_original() {
        let repo = InMemoryMappingRepository::new();
        repo.save(mapping("abc123", None)).await.unwrap();

        let mut other = mapping("abc123", None);
        other.long_url = "https://other.com".to_string();
        let err = repo.save(other).await.unwrap_err();

        assert!(matches!(err, AppError::AliasTaken { .. }));
        assert_eq!(
            repo.find("abc123").await.unwrap().unwrap().long_url,
            "https://example.com/abc123"
        );
    }

    #[tokio::test]
    async fn test_find_returns_expired_mappings() {
        let repo = InMemoryMappingRepository::new();
        repo.save(mapping("old", Some(Utc::now() - Duration::hours(1))))
            .await
            .unwrap();

        assert!(repo.find("old").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_all_expired_and_delete_batch() {
        let repo = InMemoryMappingRepository::new();
        let now = Utc::now();
        repo.save(mapping("old1", Some(now - Duration::minutes(5))))
            .await
            .unwrap();
        repo.save(mapping("old2", Some(now - Duration::seconds(1))))
            .await
            .unwrap();
        repo.save(mapping("fresh", Some(now + Duration::minutes(5))))
            .await
            .unwrap();
        repo.save(mapping("forever", None)).await.unwrap();

        let mut expired: Vec<String> = repo
            .find_all_expired(now)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.code)
            .collect();
        expired.sort();
        assert_eq!(expired, vec!["old1", "old2"]);

        let deleted = repo
            .delete_batch(&[expired[0].clone(), expired[1].clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_saves_of_same_code_have_one_winner() {
        let repo = Arc::new(InMemoryMappingRepository::new());
        let mut handles = vec![];

        for i in 0..16 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                let mut m = mapping("contested", None);
                m.long_url = format!("https://example{i}.com");
                repo.save(m).await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }
}
