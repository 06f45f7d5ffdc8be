//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Interview turns
        .route("/chat", post(handlers::chat::chat))
        .route("/chat/stream", post(handlers::chat::chat_stream))
        // Verification gate
        .route("/memories", get(handlers::memory::list_memories))
        .route("/memories/pending", get(handlers::memory::list_pending))
        .route("/memories/{id}/verify", post(handlers::memory::verify_fragment))
        .route("/memories/{id}", put(handlers::memory::edit_fragment))
        .route("/memories/{id}", delete(handlers::memory::reject_fragment))
        // Memory seeds
        .route("/seeds", get(handlers::seed::list_seeds))
        .route("/seeds", post(handlers::seed::create_seed))
        // Narrative synthesis
        .route("/narrative", post(handlers::narrative::synthesize))
        .route("/narrative", get(handlers::narrative::latest));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
