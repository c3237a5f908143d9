//! Upload intake.

use crate::error::{ApiError, ApiResult};
use crate::jobs::{JobRecord, JobStatus};
use crate::pipeline::Orchestrator;
use crate::AppState;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// POST /api/upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// POST /api/upload
///
/// Accepts a multipart `image` field, validates it (extension
/// allow-list, size cap, a real decodable image), creates the job and
/// spawns the pipeline. Returns 201 with the job id.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("image") {
            let filename = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| ApiError::BadRequest("no filename provided".to_string()))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
            upload = Some((filename, bytes.to_vec()));
        }
    }

    let Some((filename, bytes)) = upload else {
        return Err(ApiError::BadRequest("no image file provided".to_string()));
    };

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !state.config.is_allowed_extension(&extension) {
        return Err(ApiError::BadRequest(format!(
            "invalid file type .{extension}; allowed: {}",
            state.config.allowed_extensions.join(", ")
        )));
    }
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("empty file".to_string()));
    }
    if bytes.len() > state.config.max_upload_bytes {
        return Err(ApiError::BadRequest(format!(
            "file too large; maximum size is {} bytes",
            state.config.max_upload_bytes
        )));
    }
    // The bytes must decode as an actual image before we store anything
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("invalid image file: {e}")))?;
    info!(
        filename = %filename,
        width = decoded.width(),
        height = decoded.height(),
        "validated upload"
    );

    let stored_name = format!("{}.{extension}", Uuid::new_v4());
    state.storage.ensure()?;
    std::fs::write(state.storage.upload_path(&stored_name), &bytes)?;

    let record = JobRecord::new(stored_name);
    let job_id = record.id;
    state.store.create(&record).await.map_err(ApiError::Common)?;

    let orchestrator = Orchestrator::new(state.stage_context());
    tokio::spawn(async move {
        orchestrator.run(job_id).await;
    });
    info!(job_id = %job_id, "pipeline spawned");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            job_id,
            status: record.status,
        }),
    ))
}
