//! Turntable preview rendering.

use super::{load_job, save_png};
use crate::jobs::{JobStatus, JobUpdate};
use crate::pipeline::StageContext;
use pf_common::{Error, Result};
use pf_mesh::load_mesh;
use tracing::info;
use uuid::Uuid;

const AZIMUTHS: [u32; 4] = [0, 90, 180, 270];

/// Render preview images of the raw mesh.
///
/// Previews are keyed by deterministic filenames and only rendered when
/// missing, so a retried stage (or a resumed job) does not redo work.
pub(crate) async fn previews(ctx: StageContext, job_id: Uuid) -> Result<()> {
    ctx.store
        .set_status(job_id, JobStatus::RenderingPreviews, Some(70))
        .await?;
    let job = load_job(&ctx, job_id).await?;

    let names: Vec<String> = AZIMUTHS
        .iter()
        .map(|azimuth| format!("preview_{azimuth}.png"))
        .collect();

    let all_present = job.preview_images.len() == names.len()
        && names.iter().all(|name| {
            ctx.storage
                .job_path(job_id, name)
                .map(|p| p.exists())
                .unwrap_or(false)
        });
    if all_present {
        info!(job_id = %job_id, "previews already rendered, skipping");
        ctx.store.set_progress(job_id, 74).await?;
        return Ok(());
    }

    let Some(mesh_path) = job.mesh_path.as_deref() else {
        return Err(Error::processing(
            "preview_rendering",
            "raw mesh missing from job record",
        ));
    };
    let mesh = load_mesh(ctx.storage.job_path(job_id, mesh_path)?)
        .map_err(|e| Error::Internal(format!("cannot load raw mesh: {e}")))?;

    for (azimuth, name) in AZIMUTHS.iter().zip(names.iter()) {
        let image = ctx.models.preview().render(&mesh, *azimuth);
        save_png(&image, &ctx.storage.job_path(job_id, name)?)?;
    }

    ctx.store
        .update(
            job_id,
            JobUpdate {
                preview_images: Some(names),
                progress: Some(74),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}
