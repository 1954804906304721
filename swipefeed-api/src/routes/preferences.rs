//! Preference endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error_response;
use crate::AppState;

/// Body of PUT /api/preferences
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPreferencesRequest {
    pub user_id: String,
    pub customization_level: i64,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Create preference routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/preferences", put(set_preferences))
        .route("/preferences/{user_id}", get(get_preferences))
}

/// PUT /api/preferences - Set the customization level
async fn set_preferences(
    State(state): State<AppState>,
    Json(req): Json<SetPreferencesRequest>,
) -> impl IntoResponse {
    match state
        .feed_service
        .set_customization_level(&req.user_id, req.customization_level, req.updated_at)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/preferences/{user_id} - Learned state, defaults for unknown users
async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    Json(state.feed_service.preferences(&user_id).await)
}
