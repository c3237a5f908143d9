//! Pipeline orchestration.
//!
//! One fixed chain per job:
//!
//! ```text
//! UPLOADED -> GENERATING_MULTI_ANGLES -> PREPROCESSING -> RECONSTRUCTING_3D
//!    -> RENDERING_PREVIEWS -> MESH_REPAIRING -> EXPORTING_STL -> DONE
//! any stage -> ERROR
//! ```
//!
//! Stages read their inputs from the job record by field name, commit
//! their outputs back to the store, and only then does the next stage
//! start. Every stage attempt is bounded by a timeout; transient
//! failures are retried a bounded number of times with a fixed backoff,
//! then the job is moved to ERROR with the failing stage's tag.

mod stages;

use crate::inference::ModelRegistry;
use crate::jobs::{JobStatus, JobStore};
use crate::storage::StorageDirs;
use crate::workers::Queues;
use pf_common::{Error, Result, ServiceConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The units of the fixed processing chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MultiAngle,
    Preprocess,
    Reconstruct,
    Previews,
    Repair,
    Export,
}

impl Stage {
    /// Fixed execution order.
    pub const CHAIN: [Stage; 6] = [
        Stage::MultiAngle,
        Stage::Preprocess,
        Stage::Reconstruct,
        Stage::Previews,
        Stage::Repair,
        Stage::Export,
    ];

    /// Tag recorded as `error_stage` when this stage fails.
    pub fn name(self) -> &'static str {
        match self {
            Stage::MultiAngle => "multi_angle_generation",
            Stage::Preprocess => "preprocessing",
            Stage::Reconstruct => "reconstruction",
            Stage::Previews => "preview_rendering",
            Stage::Repair => "mesh_repair",
            Stage::Export => "export",
        }
    }

    /// Job status shown while this stage runs.
    pub fn status(self) -> JobStatus {
        match self {
            Stage::MultiAngle => JobStatus::GeneratingMultiAngles,
            Stage::Preprocess => JobStatus::Preprocessing,
            Stage::Reconstruct => JobStatus::Reconstructing3d,
            Stage::Previews => JobStatus::RenderingPreviews,
            Stage::Repair => JobStatus::MeshRepairing,
            Stage::Export => JobStatus::ExportingStl,
        }
    }

    /// Progress checkpoint written when the stage starts.
    pub fn entry_progress(self) -> u8 {
        match self {
            Stage::MultiAngle => 5,
            Stage::Preprocess => 25,
            Stage::Reconstruct => 45,
            Stage::Previews => 70,
            Stage::Repair => 75,
            Stage::Export => 90,
        }
    }

    /// Model inference runs on the single-slot GPU queue, geometry and
    /// image work on the CPU queue.
    fn is_gpu_bound(self) -> bool {
        matches!(self, Stage::MultiAngle | Stage::Reconstruct)
    }
}

/// Everything a stage needs, cloned per dispatch.
#[derive(Clone)]
pub struct StageContext {
    pub store: JobStore,
    pub storage: StorageDirs,
    pub queues: Queues,
    pub models: Arc<ModelRegistry>,
    pub config: Arc<ServiceConfig>,
}

/// Drives one job through the stage chain.
#[derive(Clone)]
pub struct Orchestrator {
    ctx: StageContext,
}

impl Orchestrator {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    /// Run the whole chain. Failures are recorded on the job; this
    /// function only errs when even that recording fails.
    pub async fn run(&self, job_id: Uuid) {
        info!(job_id = %job_id, "starting pipeline");
        for stage in Stage::CHAIN {
            if let Err(e) = self.run_stage(job_id, stage).await {
                let recorded = self
                    .ctx
                    .store
                    .set_error(job_id, &e.to_string(), stage.name())
                    .await;
                match recorded {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        warn!(job_id = %job_id, "job vanished before its failure could be recorded");
                    }
                    Err(store_err) => {
                        error!(job_id = %job_id, error = %store_err, "failed to record job failure");
                    }
                }
                return;
            }
        }
        info!(job_id = %job_id, "pipeline complete");
    }

    /// Run one stage with bounded retries and a per-attempt timeout.
    async fn run_stage(&self, job_id: Uuid, stage: Stage) -> Result<()> {
        let attempts = self.ctx.config.stage_retries + 1;
        let timeout = Duration::from_secs(self.ctx.config.stage_timeout_seconds);
        let backoff = Duration::from_millis(self.ctx.config.retry_backoff_ms);

        for attempt in 1..=attempts {
            let outcome = tokio::time::timeout(timeout, self.dispatch(job_id, stage)).await;
            let error = match outcome {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => e,
                Err(_) => Error::Internal(format!(
                    "stage timed out after {}s",
                    self.ctx.config.stage_timeout_seconds
                )),
            };

            if attempt < attempts && is_transient(&error) {
                warn!(
                    job_id = %job_id,
                    stage = stage.name(),
                    attempt,
                    error = %error,
                    "stage attempt failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                continue;
            }
            return Err(error);
        }
        unreachable!("retry loop always returns");
    }

    /// Submit the stage body to its queue.
    async fn dispatch(&self, job_id: Uuid, stage: Stage) -> Result<()> {
        let ctx = self.ctx.clone();
        let queue = if stage.is_gpu_bound() {
            self.ctx.queues.gpu.clone()
        } else {
            self.ctx.queues.cpu.clone()
        };
        queue
            .run(async move {
                match stage {
                    Stage::MultiAngle => stages::multi_angle(ctx, job_id).await,
                    Stage::Preprocess => stages::preprocess(ctx, job_id).await,
                    Stage::Reconstruct => stages::reconstruct(ctx, job_id).await,
                    Stage::Previews => stages::previews(ctx, job_id).await,
                    Stage::Repair => stages::repair(ctx, job_id).await,
                    Stage::Export => stages::export(ctx, job_id).await,
                }
            })
            .await?
    }
}

/// Transient infrastructure failures are retried; client errors and
/// stage-level processing failures are not.
fn is_transient(error: &Error) -> bool {
    matches!(
        error,
        Error::Database(_) | Error::Io(_) | Error::Internal(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_order_is_fixed() {
        assert_eq!(Stage::CHAIN[0], Stage::MultiAngle);
        assert_eq!(Stage::CHAIN[5], Stage::Export);
        // Entry checkpoints never decrease along the chain
        let mut last = 0;
        for stage in Stage::CHAIN {
            assert!(stage.entry_progress() > last);
            last = stage.entry_progress();
        }
    }

    #[test]
    fn stage_tags_match_their_work() {
        assert_eq!(Stage::Reconstruct.name(), "reconstruction");
        assert_eq!(Stage::Repair.name(), "mesh_repair");
    }

    #[test]
    fn gpu_routing_covers_model_stages_only() {
        assert!(Stage::MultiAngle.is_gpu_bound());
        assert!(Stage::Reconstruct.is_gpu_bound());
        assert!(!Stage::Repair.is_gpu_bound());
        assert!(!Stage::Export.is_gpu_bound());
    }

    #[test]
    fn transient_classification() {
        assert!(is_transient(&Error::Internal("timeout".into())));
        assert!(!is_transient(&Error::Validation("bad input".into())));
        assert!(!is_transient(&Error::processing("reconstruction", "no model")));
    }
}
