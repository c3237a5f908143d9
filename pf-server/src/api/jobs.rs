//! Job status and result queries.

use crate::error::{ApiError, ApiResult};
use crate::jobs::{AnalysisData, JobRecord, JobStatus};
use crate::storage::StorageDirs;
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// GET /api/jobs/{id}/status response
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_stage: Option<String>,
}

/// GET /api/jobs/{id}/result response
#[derive(Debug, Serialize)]
pub struct JobResultResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessed_image: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preview_images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stl_download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obj_download_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scaled_exports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_data: Option<AnalysisData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_dimensions: Option<MeshDimensionSummary>,
}

/// Dimension summary for frontend scaling tools.
#[derive(Debug, Serialize)]
pub struct MeshDimensionSummary {
    pub x_mm: f64,
    pub y_mm: f64,
    pub z_mm: f64,
    pub volume_mm3: f64,
    pub watertight: bool,
    pub manifold: bool,
}

/// GET /api/jobs/{id}/status
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = fetch(&state, job_id).await?;
    Ok(Json(JobStatusResponse {
        id: job.id,
        status: job.status,
        progress: job.progress,
        created_at: job.created_at,
        updated_at: job.updated_at,
        error_message: job.error_message,
        error_stage: job.error_stage,
    }))
}

/// GET /api/jobs/{id}/result
///
/// Artifact URLs appear as their stages complete; download links only
/// once the job is DONE.
pub async fn job_result(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobResultResponse>> {
    let job = fetch(&state, job_id).await?;
    let done = job.status == JobStatus::Done;

    let mesh_dimensions = job.analysis_data.as_ref().map(|a| MeshDimensionSummary {
        x_mm: a.dimensions.x,
        y_mm: a.dimensions.y,
        z_mm: a.dimensions.z,
        volume_mm3: a.volume,
        watertight: a.watertight,
        manifold: a.manifold,
    });

    Ok(Json(JobResultResponse {
        job_id: job.id,
        status: job.status,
        progress: job.progress,
        created_at: job.created_at,
        updated_at: job.updated_at,
        error_message: job.error_message,
        error_stage: job.error_stage,
        preprocessed_image: job
            .preprocessed_image
            .as_deref()
            .map(|name| StorageDirs::job_url(job.id, name)),
        preview_images: job
            .preview_images
            .iter()
            .map(|name| StorageDirs::job_url(job.id, name))
            .collect(),
        stl_download_url: (done && job.stl_path.is_some())
            .then(|| format!("/api/download/{}/stl", job.id)),
        obj_download_url: (done && job.obj_path.is_some())
            .then(|| format!("/api/download/{}/obj", job.id)),
        scaled_exports: job
            .scaled_exports
            .iter()
            .map(|name| StorageDirs::export_url(job.id, name))
            .collect(),
        analysis_data: job.analysis_data,
        mesh_dimensions,
    }))
}

async fn fetch(state: &AppState, job_id: Uuid) -> ApiResult<JobRecord> {
    state
        .store
        .get(job_id)
        .await
        .map_err(ApiError::Common)?
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id} not found")))
}
