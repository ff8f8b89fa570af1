//! Route table and middleware stack

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::constants::{API_PREFIX, MULTIPART_OVERHEAD_BYTES};
use crate::handlers::{health, tasks, video_get, video_upload};
use crate::state::AppState;

pub fn setup_routes(state: Arc<AppState>) -> Router<()> {
    let body_limit = usize::try_from(state.upload.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let video_routes = Router::new()
        .route(
            "/videos",
            post(video_upload::upload_video).get(video_get::list_videos),
        )
        .route("/videos/tasks/{task_id}", get(tasks::get_task))
        .route("/videos/{video_id}", get(video_get::get_video))
        .route("/videos/{video_id}/url", get(video_get::get_video_url));

    // Server-level concurrency limit; upload transfers are bounded separately
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest(API_PREFIX, video_routes)
        .route("/health", get(health::health_check))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
