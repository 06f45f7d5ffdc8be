//! Verification gate endpoints.
//!
//! GET    /api/v1/memories            -- verified fragments (default);
//!                                       `?include_all=true` for the
//!                                       administrative listing
//! GET    /api/v1/memories/pending    -- fragments awaiting review
//! POST   /api/v1/memories/{id}/verify
//! PUT    /api/v1/memories/{id}      -- edit content/category
//! DELETE /api/v1/memories/{id}      -- reject (hard delete)

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keepsake_types::fragment::MemoryFragment;

use crate::http::error::AppError;
use crate::state::AppState;

/// Fragment as exposed by the API: full record minus the raw embedding
/// vector, which is an internal representation.
#[derive(Debug, Serialize)]
pub struct FragmentView {
    pub id: Uuid,
    pub session_id: Uuid,
    pub category: String,
    pub content: String,
    pub context: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    pub has_embedding: bool,
    pub created_at: DateTime<Utc>,
}

impl From<MemoryFragment> for FragmentView {
    fn from(fragment: MemoryFragment) -> Self {
        Self {
            id: fragment.id,
            session_id: fragment.session_id,
            category: fragment.category,
            content: fragment.content,
            context: fragment.context,
            state: fragment.state.to_string(),
            media_ref: fragment.media_ref,
            has_embedding: fragment.embedding.is_some(),
            created_at: fragment.created_at,
        }
    }
}

/// Query parameters for the fragment listing.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Include pending fragments too. Administrative use only; the
    /// default listing is verified-only.
    #[serde(default)]
    pub include_all: bool,
}

/// Request body for the edit endpoint.
#[derive(Debug, Deserialize)]
pub struct EditFragmentRequest {
    pub content: String,
    pub category: Option<String>,
}

/// GET /api/v1/memories
pub async fn list_memories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<FragmentView>>, AppError> {
    let fragments = state.gate.list_fragments(params.include_all).await?;
    Ok(Json(fragments.into_iter().map(FragmentView::from).collect()))
}

/// GET /api/v1/memories/pending
pub async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<Vec<FragmentView>>, AppError> {
    let fragments = state.gate.list_pending().await?;
    Ok(Json(fragments.into_iter().map(FragmentView::from).collect()))
}

/// POST /api/v1/memories/{id}/verify
pub async fn verify_fragment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FragmentView>, AppError> {
    let fragment = state.gate.verify(&id).await?;
    Ok(Json(FragmentView::from(fragment)))
}

/// PUT /api/v1/memories/{id}
pub async fn edit_fragment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<EditFragmentRequest>,
) -> Result<Json<FragmentView>, AppError> {
    let fragment = state
        .gate
        .edit(&id, &body.content, body.category.as_deref())
        .await?;
    Ok(Json(FragmentView::from(fragment)))
}

/// DELETE /api/v1/memories/{id}
pub async fn reject_fragment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.gate.reject(&id).await?;
    Ok(Json(serde_json::json!({ "deleted": id.to_string() })))
}
