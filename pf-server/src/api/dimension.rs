//! Dimension validation and scaled export endpoints.

use crate::dimension::{export_scaled, ScaleFactors};
use crate::error::{ApiError, ApiResult};
use crate::jobs::Dimensions;
use crate::storage::StorageDirs;
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// POST /api/dimension/validate/{id} request
#[derive(Debug, Deserialize)]
pub struct ValidateDimensionsRequest {
    pub dimensions: Dimensions,
}

/// POST /api/dimension/validate/{id} response
#[derive(Debug, Serialize)]
pub struct ValidateDimensionsResponse {
    pub scale: ScaleFactors,
    pub original_dimensions: Dimensions,
    pub new_dimensions: Dimensions,
}

/// POST /api/dimension/update/{id} request
///
/// Either explicit factors or target physical dimensions.
#[derive(Debug, Deserialize)]
pub struct UpdateDimensionsRequest {
    pub scale: Option<ScaleFactors>,
    pub dimensions: Option<Dimensions>,
}

/// POST /api/dimension/update/{id} response
#[derive(Debug, Serialize)]
pub struct UpdateDimensionsResponse {
    pub download_url: String,
    pub scale: ScaleFactors,
    pub filename: String,
}

/// POST /api/dimension/validate/{id}
///
/// Convert target millimeters into per-axis scale factors against the
/// job's recorded original dimensions.
pub async fn validate_dimensions(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<ValidateDimensionsRequest>,
) -> ApiResult<Json<ValidateDimensionsResponse>> {
    let original = original_dimensions(&state, job_id).await?;
    let scale =
        ScaleFactors::for_target(&original, &request.dimensions).map_err(ApiError::Common)?;
    Ok(Json(ValidateDimensionsResponse {
        scale,
        original_dimensions: original,
        new_dimensions: scale.apply_to(&original),
    }))
}

/// POST /api/dimension/update/{id}
///
/// Produce a scaled export next to the canonical one.
pub async fn update_dimensions(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<UpdateDimensionsRequest>,
) -> ApiResult<Json<UpdateDimensionsResponse>> {
    let scale = match (request.scale, request.dimensions) {
        (Some(scale), _) => scale,
        (None, Some(target)) => {
            let original = original_dimensions(&state, job_id).await?;
            ScaleFactors::for_target(&original, &target).map_err(ApiError::Common)?
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "provide either 'scale' or 'dimensions'".to_string(),
            ))
        }
    };

    let filename = export_scaled(&state.store, &state.storage, job_id, &scale)
        .await
        .map_err(ApiError::Common)?;
    Ok(Json(UpdateDimensionsResponse {
        download_url: StorageDirs::export_url(job_id, &filename),
        scale,
        filename,
    }))
}

async fn original_dimensions(state: &AppState, job_id: Uuid) -> ApiResult<Dimensions> {
    let job = state
        .store
        .get(job_id)
        .await
        .map_err(ApiError::Common)?
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id} not found")))?;
    let analysis = job
        .analysis_data
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id} has no mesh dimensions yet")))?;
    Ok(analysis.dimensions)
}
