//! SQLite seed repository implementation.

use keepsake_core::memory::store::SeedRepository;
use keepsake_types::error::RepositoryError;
use keepsake_types::seed::MemorySeed;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SeedRepository`.
pub struct SqliteSeedRepository {
    pool: DatabasePool,
}

impl SqliteSeedRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_seed(row: &sqlx::sqlite::SqliteRow) -> Result<MemorySeed, RepositoryError> {
    let id_str: String = row
        .try_get("id")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let content: String = row
        .try_get("content")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let used: i64 = row
        .try_get("used")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let created_str: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    let id = Uuid::parse_str(&id_str)
        .map_err(|e| RepositoryError::Query(format!("invalid seed id: {e}")))?;
    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))?;

    Ok(MemorySeed {
        id,
        content,
        used: used != 0,
        created_at,
    })
}

impl SeedRepository for SqliteSeedRepository {
    async fn insert(&self, seed: &MemorySeed) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO memory_seeds (id, content, used, created_at) VALUES (?, ?, ?, ?)")
            .bind(seed.id.to_string())
            .bind(&seed.content)
            .bind(if seed.used { 1i64 } else { 0i64 })
            .bind(seed.created_at.to_rfc3339())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<MemorySeed>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM memory_seeds WHERE used = 0 ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(row_to_seed).collect()
    }

    async fn list_all(&self) -> Result<Vec<MemorySeed>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM memory_seeds ORDER BY created_at ASC, id ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(row_to_seed).collect()
    }

    async fn mark_used(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE memory_seeds SET used = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
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
    async fn test_insert_and_list() {
        let pool = test_pool().await;
        let repo = SqliteSeedRepository::new(pool);

        let seed = MemorySeed::new("Ask about the bakery".to_string());
        repo.insert(&seed).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "Ask about the bakery");
        assert!(!all[0].used);
    }

    #[tokio::test]
    async fn test_mark_used_removes_from_active() {
        let pool = test_pool().await;
        let repo = SqliteSeedRepository::new(pool);

        let seed = MemorySeed::new("Ask about the war years".to_string());
        repo.insert(&seed).await.unwrap();
        repo.insert(&MemorySeed::new("Ask about the bakery".to_string()))
            .await
            .unwrap();

        repo.mark_used(&seed.id).await.unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].content, "Ask about the bakery");

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_mark_used_unknown_id() {
        let pool = test_pool().await;
        let repo = SqliteSeedRepository::new(pool);
        let err = repo.mark_used(&Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
