//! Application error type mapping to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use keepsake_types::error::{GateError, NarrativeError};
use keepsake_types::llm::LlmError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Verification gate errors (explicit user actions).
    Gate(GateError),
    /// Narrative synthesis errors.
    Narrative(NarrativeError),
    /// Generation provider errors surfaced on the conversational path.
    Llm(LlmError),
    /// Requested resource does not exist.
    NotFound(String),
    /// Validation error.
    Validation(String),
    /// Generation capability not configured (no API key).
    NotConfigured,
    /// Generic internal error.
    Internal(String),
}

impl From<GateError> for AppError {
    fn from(e: GateError) -> Self {
        AppError::Gate(e)
    }
}

impl From<NarrativeError> for AppError {
    fn from(e: NarrativeError) -> Self {
        AppError::Narrative(e)
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::Llm(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Gate(GateError::NotFound) => (
                StatusCode::NOT_FOUND,
                "FRAGMENT_NOT_FOUND",
                "Fragment not found".to_string(),
            ),
            AppError::Gate(GateError::EmptyContent) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Fragment content must not be empty".to_string(),
            ),
            AppError::Gate(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                e.to_string(),
            ),
            AppError::Narrative(NarrativeError::NoVerifiedFragments) => (
                StatusCode::CONFLICT,
                "NO_VERIFIED_FRAGMENTS",
                "No verified fragments to synthesize from".to_string(),
            ),
            AppError::Narrative(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NARRATIVE_ERROR",
                e.to_string(),
            ),
            AppError::Llm(e) => (StatusCode::BAD_GATEWAY, "GENERATION_ERROR", e.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NOT_CONFIGURED",
                "Generation service is not configured".to_string(),
            ),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = json!({
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_not_found_maps_to_404() {
        let response = AppError::Gate(GateError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_empty_content_maps_to_400() {
        let response = AppError::Gate(GateError::EmptyContent).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_no_verified_fragments_maps_to_409() {
        let response =
            AppError::Narrative(NarrativeError::NoVerifiedFragments).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_not_configured_maps_to_503() {
        let response = AppError::NotConfigured.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
