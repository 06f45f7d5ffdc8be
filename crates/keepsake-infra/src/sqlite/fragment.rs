//! SQLite fragment repository implementation.
//!
//! Implements `FragmentRepository` from `keepsake-core` using sqlx with
//! split read/write pools: raw queries, a private Row struct, reader for
//! SELECTs, writer for mutations.
//!
//! Embeddings are stored in the `embedding` BLOB column as raw
//! little-endian f32 buffers and decoded through the embedding codec at
//! row-mapping time. An undecodable blob is treated as "no embedding"
//! (warn log) so retrieval recomputes the vector on demand instead of
//! failing.

use keepsake_core::embedding::codec;
use keepsake_core::memory::store::FragmentRepository;
use keepsake_types::error::RepositoryError;
use keepsake_types::fragment::{MemoryFragment, VerificationState};
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `FragmentRepository`.
pub struct SqliteFragmentRepository {
    pool: DatabasePool,
}

impl SqliteFragmentRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain MemoryFragment.
struct FragmentRow {
    id: String,
    session_id: String,
    category: String,
    content: String,
    context: String,
    embedding: Option<Vec<u8>>,
    state: String,
    media_ref: Option<String>,
    created_at: String,
}

impl FragmentRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            category: row.try_get("category")?,
            content: row.try_get("content")?,
            context: row.try_get("context")?,
            embedding: row.try_get("embedding")?,
            state: row.try_get("state")?,
            media_ref: row.try_get("media_ref")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_fragment(self) -> Result<MemoryFragment, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid fragment id: {e}")))?;
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Query(format!("invalid session_id: {e}")))?;
        let state: VerificationState = self
            .state
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let created_at = parse_datetime(&self.created_at)?;

        // A malformed blob is not fatal: retrieval treats a missing
        // embedding as "recompute on demand".
        let embedding = match self.embedding {
            None => None,
            Some(blob) => match codec::decode(&blob) {
                Ok(vector) => Some(vector),
                Err(e) => {
                    tracing::warn!(fragment_id = %id, error = %e, "malformed embedding blob; treating as absent");
                    None
                }
            },
        };

        Ok(MemoryFragment {
            id,
            session_id,
            category: self.category,
            content: self.content,
            context: self.context,
            embedding,
            state,
            media_ref: self.media_ref,
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn rows_to_fragments(
    rows: &[sqlx::sqlite::SqliteRow],
) -> Result<Vec<MemoryFragment>, RepositoryError> {
    let mut fragments = Vec::with_capacity(rows.len());
    for row in rows {
        let fragment_row =
            FragmentRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        fragments.push(fragment_row.into_fragment()?);
    }
    Ok(fragments)
}

// ---------------------------------------------------------------------------
// FragmentRepository implementation
// ---------------------------------------------------------------------------

impl FragmentRepository for SqliteFragmentRepository {
    async fn insert(&self, fragment: &MemoryFragment) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO memory_fragments (id, session_id, category, content, context, embedding, state, media_ref, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(fragment.id.to_string())
        .bind(fragment.session_id.to_string())
        .bind(&fragment.category)
        .bind(&fragment.content)
        .bind(&fragment.context)
        .bind(fragment.embedding.as_deref().map(codec::encode))
        .bind(fragment.state.to_string())
        .bind(&fragment.media_ref)
        .bind(format_datetime(&fragment.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<MemoryFragment>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM memory_fragments WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            None => Ok(None),
            Some(row) => {
                let fragment_row = FragmentRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(fragment_row.into_fragment()?))
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<MemoryFragment>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM memory_fragments ORDER BY created_at ASC, id ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_fragments(&rows)
    }

    async fn list_by_state(
        &self,
        state: VerificationState,
    ) -> Result<Vec<MemoryFragment>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM memory_fragments WHERE state = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(state.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_fragments(&rows)
    }

    async fn update_content(
        &self,
        id: &Uuid,
        content: &str,
        category: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = match category {
            Some(category) => {
                sqlx::query("UPDATE memory_fragments SET content = ?, category = ? WHERE id = ?")
                    .bind(content)
                    .bind(category)
                    .bind(id.to_string())
                    .execute(&self.pool.writer)
                    .await
            }
            None => {
                sqlx::query("UPDATE memory_fragments SET content = ? WHERE id = ?")
                    .bind(content)
                    .bind(id.to_string())
                    .execute(&self.pool.writer)
                    .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn set_state(
        &self,
        id: &Uuid,
        state: VerificationState,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE memory_fragments SET state = ? WHERE id = ?")
            .bind(state.to_string())
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn set_embedding(&self, id: &Uuid, embedding: &[f32]) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE memory_fragments SET embedding = ? WHERE id = ?")
            .bind(codec::encode(embedding))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM memory_fragments WHERE id = ?")
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
