//! Export and final analysis.

use super::load_job;
use crate::dimension::round_mm;
use crate::jobs::{AnalysisData, Dimensions, JobStatus, JobUpdate};
use crate::pipeline::StageContext;
use pf_common::{Error, Result};
use pf_mesh::{load_mesh, save_mesh, validate, MeshFormat, ThicknessOptions, ValidateOptions};
use tracing::info;
use uuid::Uuid;

const STL_NAME: &str = "model.stl";
const OBJ_NAME: &str = "model.obj";

/// Export the repaired mesh to STL and OBJ and record the analysis.
pub(crate) async fn export(ctx: StageContext, job_id: Uuid) -> Result<()> {
    ctx.store
        .set_status(job_id, JobStatus::ExportingStl, Some(90))
        .await?;
    let job = load_job(&ctx, job_id).await?;

    let Some(repaired) = job.repaired_mesh_path.as_deref() else {
        return Err(Error::processing(
            "export",
            "repaired mesh missing from job record",
        ));
    };
    let mesh = load_mesh(ctx.storage.job_path(job_id, repaired)?)
        .map_err(|e| Error::Internal(format!("cannot load repaired mesh: {e}")))?;

    let stl_path = ctx.storage.export_path(job_id, STL_NAME)?;
    save_mesh(&mesh, &stl_path, MeshFormat::Stl)
        .map_err(|e| Error::Internal(format!("STL export failed: {e}")))?;
    ctx.store.set_progress(job_id, 95).await?;

    let obj_path = ctx.storage.export_path(job_id, OBJ_NAME)?;
    save_mesh(&mesh, &obj_path, MeshFormat::Obj)
        .map_err(|e| Error::Internal(format!("OBJ export failed: {e}")))?;
    ctx.store.set_progress(job_id, 98).await?;

    // Full analysis, wall thickness included, on the exported geometry
    let options = ValidateOptions {
        thickness: ThicknessOptions {
            min_thickness_mm: ctx.config.min_wall_thickness_mm,
            ..Default::default()
        },
        ..Default::default()
    };
    let report = validate(&mesh, &options);
    let extent = mesh.bounds().extent();
    let analysis = AnalysisData {
        watertight: report.watertight,
        manifold: report.manifold,
        dimensions: Dimensions {
            x: round_mm(extent.x),
            y: round_mm(extent.y),
            z: round_mm(extent.z),
        },
        volume: if report.watertight {
            round_mm(mesh.volume())
        } else {
            0.0
        },
        surface_area: round_mm(mesh.surface_area()),
        vertices: mesh.vertex_count(),
        faces: mesh.face_count(),
        validation: report,
    };

    info!(
        job_id = %job_id,
        stl = %stl_path.display(),
        obj = %obj_path.display(),
        "export complete"
    );
    ctx.store
        .update(
            job_id,
            JobUpdate {
                status: Some(JobStatus::Done),
                progress: Some(100),
                stl_path: Some(STL_NAME.to_string()),
                obj_path: Some(OBJ_NAME.to_string()),
                analysis_data: Some(analysis),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}
