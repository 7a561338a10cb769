use axum::extract::DefaultBodyLimit;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub mod callback;
pub mod health;
pub mod metrics;
pub mod status;
pub mod upload;

/// All application routes with the standard middleware stack.
///
/// `/metrics` is added separately by the binary since it needs the
/// Prometheus handle.
pub fn build_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        // Static UI (embedded at compile time)
        .route("/", get(|| async { Html(include_str!("../../static/index.html")) }))
        .route("/health", get(health::health_check))
        .route("/upload", post(upload::submit_scan))
        .route("/webhook-callback", post(callback::workflow_callback))
        .route("/status/{job_id}", get(status::get_job_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
}
