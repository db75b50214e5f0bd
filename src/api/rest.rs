// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
//   GET /briefing  ->  200 {"mensaje": .., "imagen_base64": ..}
//   GET /health    ->  200 {"status": "ok", "server_time": <ms>, ..}
//
// `/briefing` answers 200 even when the briefing itself failed; the failure is
// described in `mensaje` and the image is empty.
//
// CORS is permissive: the endpoint is consumed by bots and dashboards on
// other origins.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app_state::AppState;

// =============================================================================
// Router construction
// =============================================================================

/// Build the API router with tracing + CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/briefing", get(briefing))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// =============================================================================
// Briefing
// =============================================================================

async fn briefing(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let result = state.briefing.run().await;
    info!(
        instrument = %state.config.primary.label,
        has_image = result.has_image(),
        "Briefing served"
    );
    Json(result)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    uptime_secs: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.uptime_secs(),
    })
}
