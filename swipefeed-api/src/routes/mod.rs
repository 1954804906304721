//! API route definitions

mod activity;
mod articles;
mod health;
mod preferences;

use axum::{http::StatusCode, response::IntoResponse, Json, Router};
use swipefeed_services::ServiceError;
use tracing::error;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(articles::routes())
        .merge(activity::routes())
        .merge(preferences::routes())
        .merge(health::routes())
}

/// Full application router with state attached
pub fn app(state: AppState) -> Router {
    Router::new().nest("/api", api_routes()).with_state(state)
}

/// Map a service failure onto a status code and `{"error": ...}` body
pub(crate) fn error_response(err: ServiceError) -> axum::response::Response {
    let status = match &err {
        ServiceError::NoAccessibleSource => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }

    (
        status,
        Json(serde_json::json!({
            "error": err.to_string()
        })),
    )
        .into_response()
}
