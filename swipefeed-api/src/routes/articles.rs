//! Article feed and search endpoints

use std::collections::HashSet;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use swipefeed_services::ArticleQuery;
use tracing::debug;

use super::error_response;
use crate::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

/// Query parameters for the article feed
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesParams {
    pub limit: Option<usize>,
    /// Comma-separated ids the client has already shown
    pub seen_ids: Option<String>,
    /// Personalize for this user
    pub user_id: Option<String>,
}

/// Query parameters for search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

/// Create article routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/articles", get(get_articles))
        .route("/search", get(search_articles))
}

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
}

fn parse_seen_ids(raw: Option<&str>) -> HashSet<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// GET /api/articles - One page of articles, personalized when `userId` is given
async fn get_articles(
    State(state): State<AppState>,
    Query(params): Query<ArticlesParams>,
) -> impl IntoResponse {
    let query = ArticleQuery {
        limit: clamp_limit(params.limit),
        seen_ids: parse_seen_ids(params.seen_ids.as_deref()),
        user_id: params.user_id,
    };

    match state.feed_service.get_articles(&query).await {
        Ok(articles) => (StatusCode::OK, Json(articles)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/search - Free-text search over the cached pool
async fn search_articles(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        debug!("Empty search query");
        return (StatusCode::OK, Json(serde_json::json!([]))).into_response();
    }

    match state.feed_service.search(&query, clamp_limit(params.limit)).await {
        Ok(articles) => (StatusCode::OK, Json(articles)).into_response(),
        Err(e) => error_response(e),
    }
}
