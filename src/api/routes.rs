use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};

use crate::api::models::{PageRequest, SearchRequest};
use crate::api::response;
use crate::error::{Result, WikiError};
use crate::AppState;

/// Upper bound on a whole handler, retries and backoff included.
const HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/search", post(search_handler))
        .route("/api/smart-search", post(smart_search_handler))
        .route("/api/page", post(page_handler))
        .route("/api/page-data", post(page_data_handler))
        .route("/api/cache/stats", get(cache_stats_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

/// Runs `work` under the handler timeout and wraps the outcome.
async fn respond<T, F>(operation: &str, work: F) -> Response
where
    T: Serialize,
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = tokio::time::timeout(HANDLER_TIMEOUT, work).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(data)) => {
            tracing::info!(operation, elapsed_ms, "request succeeded");
            response::success(data).into_response()
        }
        Ok(Err(err)) => {
            tracing::warn!(
                operation,
                elapsed_ms,
                kind = err.kind(),
                error = %err,
                "request failed"
            );
            err.into_response()
        }
        Err(_) => {
            tracing::error!(operation, elapsed_ms, "request timed out");
            response::error::<()>(
                StatusCode::REQUEST_TIMEOUT,
                "Request processing timed out".to_string(),
            )
            .into_response()
        }
    }
}

async fn search_handler(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> impl IntoResponse {
    respond("search", async {
        Ok::<_, WikiError>(state.client.search(&req.query, req.limit).await)
    })
    .await
}

async fn smart_search_handler(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> impl IntoResponse {
    respond("smart_search", async {
        Ok::<_, WikiError>(state.client.smart_search(&req.query, req.limit).await)
    })
    .await
}

async fn page_handler(
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> impl IntoResponse {
    respond("page", state.client.fetch_page(&req.page_title)).await
}

async fn page_data_handler(
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> impl IntoResponse {
    respond("page_data", state.client.page_data(&req.page_title)).await
}

async fn cache_stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    response::success(state.client.cache_stats())
}
