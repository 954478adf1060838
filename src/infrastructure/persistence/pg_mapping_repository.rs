//! PostgreSQL implementation of the mapping repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::Mapping;
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct MappingRow {
    code: String,
    long_url: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    hit_count: i64,
}

impl From<MappingRow> for Mapping {
    fn from(r: MappingRow) -> Self {
        Mapping {
            code: r.code,
            long_url: r.long_url,
            created_at: r.created_at,
            expires_at: r.expires_at,
            hit_count: r.hit_count,
        }
    }
}

/// PostgreSQL repository for mapping storage and retrieval.
///
/// Uniqueness of `code` is enforced by the primary key; `save` relies on
/// `ON CONFLICT DO NOTHING` so concurrent inserts of one code cannot both win.
pub struct PgMappingRepository {
    pool: Arc<PgPool>,
}

impl PgMappingRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for PgMappingRepository {
    async fn find(&self, code: &str) -> Result<Option<Mapping>, AppError> {
        let row = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT code, long_url, created_at, expires_at, hit_count
            FROM url_mappings
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Mapping::from))
    }

    async fn save(&self, mapping: Mapping) -> Result<Mapping, AppError> {
        let row = sqlx::query_as::<_, MappingRow>(
            r#"
            INSERT INTO url_mappings (code, long_url, created_at, expires_at, hit_count)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code) DO NOTHING
            RETURNING code, long_url, created_at, expires_at, hit_count
            "#,
        )
        .bind(&mapping.code)
        .bind(&mapping.long_url)
        .bind(mapping.created_at)
        .bind(mapping.expires_at)
        .bind(mapping.hit_count)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Mapping::from)
            .ok_or_else(|| AppError::alias_taken(&mapping.code))
    }

    async fn exists(&self, code: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM url_mappings WHERE code = $1)",
        )
        .bind(code)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn find_all_expired(&self, now: DateTime<Utc>) -> Result<Vec<Mapping>, AppError> {
        let rows = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT code, long_url, created_at, expires_at, hit_count
            FROM url_mappings
            WHERE expires_at IS NOT NULL AND expires_at < $1
            "#,
        )
        .bind(now)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Mapping::from).collect())
    }

    async fn delete_batch(&self, codes: &[String]) -> Result<u64, AppError> {
        if codes.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM url_mappings WHERE code = ANY($1)")
            .bind(codes)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
