//! Memory seed endpoints.
//!
//! GET  /api/v1/seeds -- active (unused) seeds
//! POST /api/v1/seeds -- create a seed (e.g. from the family dashboard)

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use keepsake_core::memory::store::SeedRepository;
use keepsake_types::seed::MemorySeed;

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for seed creation.
#[derive(Debug, Deserialize)]
pub struct CreateSeedRequest {
    pub content: String,
}

/// GET /api/v1/seeds
pub async fn list_seeds(
    State(state): State<AppState>,
) -> Result<Json<Vec<MemorySeed>>, AppError> {
    let seeds = state
        .seed_repo
        .list_active()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(seeds))
}

/// POST /api/v1/seeds
pub async fn create_seed(
    State(state): State<AppState>,
    Json(body): Json<CreateSeedRequest>,
) -> Result<Json<MemorySeed>, AppError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("seed content must not be empty".to_string()));
    }

    let seed = MemorySeed::new(content.to_string());
    state
        .seed_repo
        .insert(&seed)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(seed))
}
