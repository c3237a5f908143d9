//! Background removal preprocessing.

use super::{load_job, load_rgba, save_png};
use crate::inference::ModelHandle;
use crate::jobs::{JobStatus, JobUpdate};
use crate::pipeline::StageContext;
use pf_common::Result;
use tracing::{info, warn};
use uuid::Uuid;

const OUTPUT_NAME: &str = "preprocessed.png";

/// Cut the subject out of the front view for reconstruction.
pub(crate) async fn preprocess(ctx: StageContext, job_id: Uuid) -> Result<()> {
    ctx.store
        .set_status(job_id, JobStatus::Preprocessing, Some(25))
        .await?;
    let job = load_job(&ctx, job_id).await?;

    // Front view produced by the previous stage, by name
    let front = job
        .multi_angle_images
        .iter()
        .find(|name| name.as_str() == "angle_0.png");
    let source = match front {
        Some(name) => ctx.storage.job_path(job_id, name)?,
        None => ctx.storage.upload_path(&job.image_path),
    };
    let image = load_rgba(&source)?;
    ctx.store.set_progress(job_id, 35).await?;

    let processed = match ctx.models.matting() {
        ModelHandle::Loaded(matte) => {
            info!(job_id = %job_id, "removing background");
            matte.remove_background(&image)
        }
        ModelHandle::Unavailable => {
            warn!(
                job_id = %job_id,
                "background matting model unavailable, passing the image through unchanged"
            );
            image
        }
    };

    save_png(&processed, &ctx.storage.job_path(job_id, OUTPUT_NAME)?)?;
    ctx.store
        .update(
            job_id,
            JobUpdate {
                preprocessed_image: Some(OUTPUT_NAME.to_string()),
                progress: Some(40),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}
