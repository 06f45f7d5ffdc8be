//! SQLite session repository implementation.
//!
//! Session rows are created lazily (INSERT OR IGNORE) the first time a
//! fragment is extracted for the session, then updated with the era
//! classification.

use keepsake_core::memory::store::SessionRepository;
use keepsake_types::error::RepositoryError;
use keepsake_types::fragment::Era;
use keepsake_types::session::InterviewSession;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn ensure_session(&self, id: &Uuid) -> Result<(), RepositoryError> {
        sqlx::query("INSERT OR IGNORE INTO interview_sessions (id, era, created_at) VALUES (?, ?, ?)")
            .bind(id.to_string())
            .bind(Era::default().to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn set_era(&self, id: &Uuid, era: Era) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE interview_sessions SET era = ? WHERE id = ?")
            .bind(era.to_string())
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn get_session(&self, id: &Uuid) -> Result<Option<InterviewSession>, RepositoryError> {
        let row = sqlx::query("SELECT id, era, created_at FROM interview_sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id_str: String = row
            .try_get("id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let era_str: String = row
            .try_get("era")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let created_str: String = row
            .try_get("created_at")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let id = Uuid::parse_str(&id_str)
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;
        let era: Era = era_str.parse().map_err(|e: String| RepositoryError::Query(e))?;
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))?;

        Ok(Some(InterviewSession {
            id,
            era,
            created_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::DatabasePool;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_ensure_session_is_idempotent() {
        let pool = test_pool().await;
        let repo = SqliteSessionRepository::new(pool);
        let session_id = Uuid::now_v7();

        repo.ensure_session(&session_id).await.unwrap();
        repo.ensure_session(&session_id).await.unwrap();

        let session = repo.get_session(&session_id).await.unwrap().unwrap();
        assert_eq!(session.id, session_id);
        assert_eq!(session.era, Era::Modern);
    }

    #[tokio::test]
    async fn test_set_era() {
        let pool = test_pool().await;
        let repo = SqliteSessionRepository::new(pool);
        let session_id = Uuid::now_v7();

        repo.ensure_session(&session_id).await.unwrap();
        repo.set_era(&session_id, Era::Sepia).await.unwrap();

        let session = repo.get_session(&session_id).await.unwrap().unwrap();
        assert_eq!(session.era, Era::Sepia);
    }

    #[tokio::test]
    async fn test_set_era_unknown_session() {
        let pool = test_pool().await;
        let repo = SqliteSessionRepository::new(pool);
        let err = repo.set_era(&Uuid::now_v7(), Era::Vintage).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_get_unknown_session_is_none() {
        let pool = test_pool().await;
        let repo = SqliteSessionRepository::new(pool);
        assert!(repo.get_session(&Uuid::now_v7()).await.unwrap().is_none());
    }
}
