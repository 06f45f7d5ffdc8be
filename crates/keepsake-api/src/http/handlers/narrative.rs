//! Narrative synthesis endpoints.
//!
//! POST /api/v1/narrative -- synthesize from verified fragments
//! GET  /api/v1/narrative -- most recent narrative

use axum::extract::State;
use axum::Json;

use keepsake_core::memory::store::NarrativeRepository;
use keepsake_types::narrative::SynthesizedNarrative;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /api/v1/narrative
pub async fn synthesize(
    State(state): State<AppState>,
) -> Result<Json<SynthesizedNarrative>, AppError> {
    let synthesizer = state.synthesizer.as_ref().ok_or(AppError::NotConfigured)?;
    let narrative = synthesizer.synthesize().await?;
    Ok(Json(narrative))
}

/// GET /api/v1/narrative
///
/// Reads straight from the store; works without a configured generation
/// provider.
pub async fn latest(
    State(state): State<AppState>,
) -> Result<Json<SynthesizedNarrative>, AppError> {
    let narrative = state
        .narrative_repo
        .latest()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("no narrative has been synthesized yet".to_string()))?;
    Ok(Json(narrative))
}
