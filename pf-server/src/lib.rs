//! pf-server - photo to 3D-printable model service
//!
//! Accepts a photo upload, drives it through a multi-stage asynchronous
//! pipeline (view synthesis, background removal, reconstruction,
//! preview rendering, mesh repair, export) and serves the resulting
//! printable artifacts. Geometry lives in `pf-mesh`; this crate holds
//! the HTTP surface, job store, worker queues, inference collaborators
//! and the orchestrator.

pub mod api;
pub mod dimension;
pub mod error;
pub mod inference;
pub mod jobs;
pub mod pipeline;
pub mod storage;
pub mod workers;

pub use crate::error::{ApiError, ApiResult};

use crate::inference::ModelRegistry;
use crate::jobs::JobStore;
use crate::pipeline::StageContext;
use crate::storage::StorageDirs;
use crate::workers::Queues;
use axum::Router;
use pf_common::ServiceConfig;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub store: JobStore,
    pub storage: StorageDirs,
    pub queues: Queues,
    pub models: Arc<ModelRegistry>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: Arc<ServiceConfig>,
        store: JobStore,
        storage: StorageDirs,
        queues: Queues,
        models: Arc<ModelRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            storage,
            queues,
            models,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Context handed to the orchestrator for each job.
    pub fn stage_context(&self) -> StageContext {
        StageContext {
            store: self.store.clone(),
            storage: self.storage.clone(),
            queues: self.queues.clone(),
            models: Arc::clone(&self.models),
            config: Arc::clone(&self.config),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let jobs_files = ServeDir::new(state.storage.jobs());
    let export_files = ServeDir::new(state.storage.exports());

    Router::new()
        .merge(api::routes())
        .nest_service("/api/files/jobs", jobs_files)
        .nest_service("/api/files/exports", export_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
