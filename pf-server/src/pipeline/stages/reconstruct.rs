//! 3D reconstruction from the preprocessed image.

use super::{load_job, load_rgba};
use crate::inference::ModelHandle;
use crate::jobs::{JobStatus, JobUpdate};
use crate::pipeline::StageContext;
use pf_common::{Error, Result};
use pf_mesh::{save_mesh, MeshFormat};
use tracing::info;
use uuid::Uuid;

const OUTPUT_NAME: &str = "raw_mesh.ply";

/// Map the preprocessed image to a raw triangle mesh.
pub(crate) async fn reconstruct(ctx: StageContext, job_id: Uuid) -> Result<()> {
    ctx.store
        .set_status(job_id, JobStatus::Reconstructing3d, Some(45))
        .await?;
    let job = load_job(&ctx, job_id).await?;

    let Some(preprocessed) = job.preprocessed_image.as_deref() else {
        return Err(Error::processing(
            "reconstruction",
            "preprocessed image missing from job record",
        ));
    };
    let image = load_rgba(&ctx.storage.job_path(job_id, preprocessed)?)?;
    ctx.store.set_progress(job_id, 55).await?;

    let mesh = match ctx.models.reconstruction() {
        ModelHandle::Loaded(model) => model.reconstruct(&image).map_err(|e| {
            Error::processing("reconstruction", format!("model inference failed: {e}"))
        })?,
        ModelHandle::Unavailable => {
            return Err(Error::processing(
                "reconstruction",
                "reconstruction model unavailable",
            ));
        }
    };
    if mesh.is_empty() {
        return Err(Error::processing("reconstruction", "model returned no mesh"));
    }
    ctx.store.set_progress(job_id, 60).await?;

    info!(
        job_id = %job_id,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "reconstructed raw mesh"
    );
    let path = ctx.storage.job_path(job_id, OUTPUT_NAME)?;
    save_mesh(&mesh, &path, MeshFormat::Ply)
        .map_err(|e| Error::Internal(format!("cannot write raw mesh: {e}")))?;

    ctx.store
        .update(
            job_id,
            JobUpdate {
                mesh_path: Some(OUTPUT_NAME.to_string()),
                progress: Some(65),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}
