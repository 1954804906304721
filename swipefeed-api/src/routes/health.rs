//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    article_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Reports the cached snapshot without fetching; degraded until a refresh
/// has produced articles
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.article_cache.snapshot_len().await {
        Some(count) if count > 0 => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                article_count: count,
                error: None,
            }),
        ),
        other => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded".to_string(),
                article_count: 0,
                error: Some(match other {
                    Some(_) => "Article snapshot is empty".to_string(),
                    None => "No articles fetched yet".to_string(),
                }),
            }),
        ),
    }
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}
