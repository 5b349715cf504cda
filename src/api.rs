//! HTTP surface: router assembly, movie search and health.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::provider::MovieSearchResult;
use crate::state::AppState;
use crate::ws;

const MAX_SEARCH_RESULTS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub rooms: usize,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/search-movies", get(search_movies))
        .route("/health", get(health))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Movie title autocomplete.
///
/// GET /search-movies?query=...
pub async fn search_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<MovieSearchResult>>, (StatusCode, Json<ErrorBody>)> {
    let query = params.query.trim();
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }

    match state.movies.search_movies(query).await {
        Ok(mut results) => {
            results.truncate(MAX_SEARCH_RESULTS);
            Ok(Json(results))
        }
        Err(e) => {
            tracing::error!("Movie search for {:?} failed: {}", query, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "Movie search failed".to_string(),
                }),
            ))
        }
    }
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (status, rooms) = match state.rooms.count().await {
        Ok(rooms) => ("ok", rooms),
        Err(e) => {
            tracing::warn!("Room store health check failed: {}", e);
            ("degraded", 0)
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        rooms,
    })
}
