//! SQLite narrative repository implementation.
//!
//! Narratives accumulate, but only the most recent is consumed
//! downstream; `latest` orders by creation time and id (UUIDv7 ids are
//! time-sortable, breaking same-timestamp ties).

use keepsake_core::memory::store::NarrativeRepository;
use keepsake_types::error::RepositoryError;
use keepsake_types::narrative::SynthesizedNarrative;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `NarrativeRepository`.
pub struct SqliteNarrativeRepository {
    pool: DatabasePool,
}

impl SqliteNarrativeRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl NarrativeRepository for SqliteNarrativeRepository {
    async fn insert(&self, narrative: &SynthesizedNarrative) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO narratives (id, content, created_at) VALUES (?, ?, ?)")
            .bind(narrative.id.to_string())
            .bind(&narrative.content)
            .bind(narrative.created_at.to_rfc3339())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn latest(&self) -> Result<Option<SynthesizedNarrative>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, content, created_at FROM narratives ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id_str: String = row
            .try_get("id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let created_str: String = row
            .try_get("created_at")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let id = Uuid::parse_str(&id_str)
            .map_err(|e| RepositoryError::Query(format!("invalid narrative id: {e}")))?;
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))?;

        Ok(Some(SynthesizedNarrative {
            id,
            content,
            created_at,
        }))
    }
}
