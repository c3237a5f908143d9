//! Stage bodies.
//!
//! Each stage loads the job record, reads its inputs from named record
//! fields, writes artifacts under deterministic filenames (so a retry
//! overwrites its own partial output), and commits progress
//! checkpoints through the store.

mod export;
mod multi_angle;
mod preprocess;
mod previews;
mod reconstruct;
mod repair;

pub(crate) use export::export;
pub(crate) use multi_angle::multi_angle;
pub(crate) use preprocess::preprocess;
pub(crate) use previews::previews;
pub(crate) use reconstruct::reconstruct;
pub(crate) use repair::repair;

use crate::jobs::JobRecord;
use crate::pipeline::StageContext;
use image::RgbaImage;
use pf_common::{Error, Result};
use std::path::Path;
use uuid::Uuid;

/// Fetch the job record or fail the stage.
async fn load_job(ctx: &StageContext, job_id: Uuid) -> Result<JobRecord> {
    ctx.store
        .get(job_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("job {job_id}")))
}

/// Decode an image file into RGBA.
fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .map_err(|e| Error::Internal(format!("cannot decode {}: {e}", path.display())))?;
    Ok(image.to_rgba8())
}

/// Encode an image as PNG.
fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| Error::Internal(format!("cannot write {}: {e}", path.display())))
}
