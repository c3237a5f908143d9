//! Mesh validation and repair.

use super::load_job;
use crate::jobs::{JobStatus, JobUpdate};
use crate::pipeline::StageContext;
use pf_common::{Error, Result};
use pf_mesh::{load_mesh, save_mesh, validate, MeshFormat, RepairOptions, ValidateOptions};
use tracing::info;
use uuid::Uuid;

const OUTPUT_NAME: &str = "repaired_mesh.ply";

/// Repair the raw mesh for printing.
pub(crate) async fn repair(ctx: StageContext, job_id: Uuid) -> Result<()> {
    ctx.store
        .set_status(job_id, JobStatus::MeshRepairing, Some(75))
        .await?;
    let job = load_job(&ctx, job_id).await?;

    let Some(mesh_path) = job.mesh_path.as_deref() else {
        return Err(Error::processing(
            "mesh_repair",
            "raw mesh missing from job record",
        ));
    };
    let mesh = load_mesh(ctx.storage.job_path(job_id, mesh_path)?)
        .map_err(|e| Error::Internal(format!("cannot load raw mesh: {e}")))?;
    mesh.check()
        .map_err(|e| Error::processing("mesh_repair", format!("structurally invalid mesh: {e}")))?;
    ctx.store.set_progress(job_id, 78).await?;

    // Structural pre-check; the full analysis happens after export
    let structural = ValidateOptions {
        skip_thickness: true,
        ..Default::default()
    };
    let before = validate(&mesh, &structural);
    info!(
        job_id = %job_id,
        watertight = before.watertight,
        degenerate = before.degenerate_faces,
        "validation before repair"
    );
    ctx.store.set_progress(job_id, 80).await?;

    let (repaired, summary) = pf_mesh::repair(&mesh, &RepairOptions::default());
    ctx.store.set_progress(job_id, 85).await?;

    let after = validate(&repaired, &structural);
    info!(
        job_id = %job_id,
        watertight = after.watertight,
        merged = summary.vertices_merged,
        degenerate_removed = summary.degenerate_faces_removed,
        duplicates_removed = summary.duplicate_faces_removed,
        holes_filled = summary.holes_filled,
        "validation after repair"
    );

    let path = ctx.storage.job_path(job_id, OUTPUT_NAME)?;
    save_mesh(&repaired, &path, MeshFormat::Ply)
        .map_err(|e| Error::Internal(format!("cannot write repaired mesh: {e}")))?;

    ctx.store
        .update(
            job_id,
            JobUpdate {
                repaired_mesh_path: Some(OUTPUT_NAME.to_string()),
                progress: Some(88),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}
