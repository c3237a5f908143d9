//! Multi-angle view generation.

use super::{load_job, load_rgba, save_png};
use crate::inference::ModelHandle;
use crate::jobs::{JobStatus, JobUpdate};
use crate::pipeline::StageContext;
use pf_common::Result;
use tracing::{info, warn};
use uuid::Uuid;

const AZIMUTHS: [u32; 4] = [0, 90, 180, 270];

/// Generate one view per azimuth from the uploaded photo.
///
/// When no synthesis model is resident the uploaded photo itself is
/// recorded as the front view; the fallback is logged, never silent.
pub(crate) async fn multi_angle(ctx: StageContext, job_id: Uuid) -> Result<()> {
    ctx.store
        .set_status(job_id, JobStatus::GeneratingMultiAngles, Some(5))
        .await?;
    let job = load_job(&ctx, job_id).await?;

    let source = ctx.storage.upload_path(&job.image_path);
    let image = load_rgba(&source)?;
    ctx.store.set_progress(job_id, 10).await?;

    let mut names = Vec::new();
    match ctx.models.multi_angle() {
        ModelHandle::Loaded(model) => {
            info!(job_id = %job_id, "synthesizing {} views", AZIMUTHS.len());
            let views = model.synthesize(&image, &AZIMUTHS)?;
            for (azimuth, view) in AZIMUTHS.iter().zip(views.iter()) {
                let name = format!("angle_{azimuth}.png");
                save_png(view, &ctx.storage.job_path(job_id, &name)?)?;
                names.push(name);
            }
        }
        ModelHandle::Unavailable => {
            warn!(
                job_id = %job_id,
                "multi-angle model unavailable, storing the uploaded photo as the front view"
            );
            let name = "angle_0.png".to_string();
            save_png(&image, &ctx.storage.job_path(job_id, &name)?)?;
            names.push(name);
        }
    }

    ctx.store
        .update(
            job_id,
            JobUpdate {
                multi_angle_images: Some(names),
                progress: Some(20),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}
