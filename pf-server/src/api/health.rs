//! Health check endpoint.

use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

/// GET /health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_seconds: i64,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = (chrono::Utc::now() - state.startup_time).num_seconds();
    Json(HealthResponse {
        service: "pf-server",
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
        uptime_seconds: uptime,
    })
}
