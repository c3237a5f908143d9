//! HTTP API handlers.

mod dimension;
mod download;
mod health;
mod jobs;
mod upload;

use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

/// Uploads larger than this never reach the handler; the configured
/// per-deployment limit is enforced inside it.
const BODY_LIMIT: usize = 64 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload::upload_image))
        .route("/api/jobs/:job_id/status", get(jobs::job_status))
        .route("/api/jobs/:job_id/result", get(jobs::job_result))
        .route("/api/download/:job_id/:format", get(download::download_file))
        .route(
            "/api/dimension/validate/:job_id",
            post(dimension::validate_dimensions),
        )
        .route(
            "/api/dimension/update/:job_id",
            post(dimension::update_dimensions),
        )
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}
