//! Activity recording endpoint

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use swipefeed_core::ActivityEvent;

use super::error_response;
use crate::AppState;

/// Create activity routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/activity", post(record_activity))
}

/// POST /api/activity - Record a user interaction with an article
async fn record_activity(
    State(state): State<AppState>,
    Json(event): Json<ActivityEvent>,
) -> impl IntoResponse {
    match state.feed_service.record_activity(event).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{get, ids, json, send, test_app};
    use serde_json::json;

    #[tokio::test]
    async fn test_like_then_personalized_feed() {
        let app = test_app();

        let (status, body) = send(
            &app,
            json(
                "POST",
                "/api/activity",
                json!({
                    "userId": "u1",
                    "articleId": "bbc-0",
                    "action": "liked",
                    "timestamp": "2025-06-10T00:00:00Z",
                    "metadata": { "source": "BBC" }
                }),
            ),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "ok": true }));

        let (status, _) = send(
            &app,
            json("PUT", "/api/preferences", json!({ "userId": "u1", "customizationLevel": 100 })),
        )
        .await;
        assert_eq!(status, 200);

        let (_, body) = send(&app, get("/api/articles?limit=2&userId=u1")).await;
        assert_eq!(ids(&body), vec!["bbc-1"]);
    }

    #[tokio::test]
    async fn test_missing_timestamp_is_accepted() {
        let (status, _) = send(
            &test_app(),
            json(
                "POST",
                "/api/activity",
                json!({ "userId": "u1", "articleId": "a1", "action": "viewed" }),
            ),
        )
        .await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_invalid_activity_is_rejected() {
        let app = test_app();

        let (status, body) = send(
            &app,
            json(
                "POST",
                "/api/activity",
                json!({ "userId": " ", "articleId": "a1", "action": "viewed" }),
            ),
        )
        .await;
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().contains("userId"));

        // Unknown action fails JSON extraction
        let (status, _) = send(
            &app,
            json(
                "POST",
                "/api/activity",
                json!({ "userId": "u1", "articleId": "a1", "action": "bookmarked" }),
            ),
        )
        .await;
        assert!((400..500).contains(&status));
    }
}
