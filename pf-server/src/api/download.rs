//! Export downloads.

use crate::error::{ApiError, ApiResult};
use crate::jobs::JobStatus;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

/// GET /api/download/{id}/{format}
///
/// Streams the exported binary. 400 for an unknown format token, 404
/// unless the job reached DONE and the artifact exists.
pub async fn download_file(
    State(state): State<AppState>,
    Path((job_id, format)): Path<(Uuid, String)>,
) -> ApiResult<Response> {
    let (content_type, artifact) = match format.as_str() {
        "stl" => ("application/sla", None),
        "obj" => ("text/plain", None),
        // Scaled exports are addressed by their full filename
        name if name.starts_with("scaled_mesh_") && name.ends_with(".stl") => {
            ("application/sla", Some(name.to_string()))
        }
        _ => {
            return Err(ApiError::BadRequest(format!(
                "invalid format '{format}'; use 'stl' or 'obj'"
            )))
        }
    };

    let job = state
        .store
        .get(job_id)
        .await
        .map_err(ApiError::Common)?
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id} not found")))?;
    if job.status != JobStatus::Done {
        return Err(ApiError::NotFound(format!("job {job_id} is not finished")));
    }

    let filename = match (&artifact, format.as_str()) {
        (Some(name), _) => {
            if !job.scaled_exports.iter().any(|s| s == name) {
                return Err(ApiError::NotFound(format!("no scaled export {name}")));
            }
            name.clone()
        }
        (None, "stl") => job
            .stl_path
            .clone()
            .ok_or_else(|| ApiError::NotFound("STL not available".to_string()))?,
        (None, _) => job
            .obj_path
            .clone()
            .ok_or_else(|| ApiError::NotFound("OBJ not available".to_string()))?,
    };

    let path = state.storage.export_path(job_id, &filename)?;
    if !path.is_file() {
        return Err(ApiError::NotFound(format!("artifact {filename} missing")));
    }
    let bytes = tokio::fs::read(&path).await?;

    let short_id = job_id.simple().to_string();
    let download_name = match &artifact {
        Some(name) => name.clone(),
        None => format!("model_{}.{format}", &short_id[..8]),
    };
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{download_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
