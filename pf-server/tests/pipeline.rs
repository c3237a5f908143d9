//! End-to-end pipeline tests with the built-in inference backends.

use image::{Rgba, RgbaImage};
use pf_common::ServiceConfig;
use pf_server::inference::ModelRegistry;
use pf_server::jobs::{JobRecord, JobStatus, JobStore};
use pf_server::pipeline::{Orchestrator, StageContext};
use pf_server::storage::StorageDirs;
use pf_server::workers::Queues;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

struct Harness {
    ctx: StageContext,
    _dir: TempDir,
}

async fn harness(models: ModelRegistry) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        storage_root: dir.path().join("storage"),
        mesh_resolution: 16,
        cpu_workers: 2,
        stage_timeout_seconds: 60,
        stage_retries: 1,
        retry_backoff_ms: 10,
        ..Default::default()
    };
    let storage = StorageDirs::new(&config.storage_root);
    storage.ensure().unwrap();
    let store = JobStore::connect(&dir.path().join("jobs.db"), config.job_ttl_seconds)
        .await
        .unwrap();
    let ctx = StageContext {
        store,
        storage,
        queues: Queues::start(config.cpu_workers),
        models: Arc::new(models),
        config: Arc::new(config),
    };
    Harness { ctx, _dir: dir }
}

/// White background with a bright centered square, saved as PNG.
async fn upload_photo(harness: &Harness) -> Uuid {
    let mut photo = RgbaImage::from_pixel(64, 64, Rgba([250, 250, 250, 255]));
    for y in 16..48 {
        for x in 16..48 {
            photo.put_pixel(x, y, Rgba([220, 40, 40, 255]));
        }
    }
    let name = format!("{}.png", Uuid::new_v4());
    photo
        .save_with_format(
            harness.ctx.storage.upload_path(&name),
            image::ImageFormat::Png,
        )
        .unwrap();

    let record = JobRecord::new(name);
    let id = record.id;
    harness.ctx.store.create(&record).await.unwrap();
    id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn job_runs_to_done_with_monotonic_progress() {
    let harness = harness(ModelRegistry::new(16, 64)).await;
    let job_id = upload_photo(&harness).await;

    let orchestrator = Orchestrator::new(harness.ctx.clone());
    let store = harness.ctx.store.clone();
    let run = tokio::spawn(async move { orchestrator.run(job_id).await });

    // Poll the job like a client would, recording every observation
    let mut observations = Vec::new();
    loop {
        if let Some(job) = store.get(job_id).await.unwrap() {
            observations.push((job.status, job.progress));
            if job.status.is_terminal() {
                break;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    run.await.unwrap();

    // Progress never decreased at any observed poll
    for window in observations.windows(2) {
        assert!(
            window[1].1 >= window[0].1,
            "progress regressed: {observations:?}"
        );
    }

    let job = store.get(job_id).await.unwrap().expect("job still stored");
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.progress, 100);
    assert!(job.error_message.is_none());

    // Every stage left its artifact behind
    assert!(!job.multi_angle_images.is_empty());
    assert!(job.preprocessed_image.is_some());
    assert!(job.mesh_path.is_some());
    assert_eq!(job.preview_images.len(), 4);
    assert!(job.repaired_mesh_path.is_some());
    assert_eq!(job.stl_path.as_deref(), Some("model.stl"));
    assert_eq!(job.obj_path.as_deref(), Some("model.obj"));

    let storage = &harness.ctx.storage;
    assert!(storage.export_path(job_id, "model.stl").unwrap().is_file());
    assert!(storage.export_path(job_id, "model.obj").unwrap().is_file());
    for name in &job.preview_images {
        assert!(storage.job_path(job_id, name).unwrap().is_file());
    }

    // Analysis reflects a watertight relief plaque in millimeters
    let analysis = job.analysis_data.expect("analysis recorded");
    assert!(analysis.watertight);
    assert!(analysis.manifold);
    assert!(analysis.dimensions.x > 10.0);
    assert!(analysis.volume > 0.0);
    assert!(analysis.faces > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reconstruction_failure_is_attributed_and_final() {
    let harness = harness(ModelRegistry::without_reconstruction(16, 64)).await;
    let job_id = upload_photo(&harness).await;

    Orchestrator::new(harness.ctx.clone()).run(job_id).await;

    let job = harness
        .ctx
        .store
        .get(job_id)
        .await
        .unwrap()
        .expect("failed job remains queryable");
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error_stage.as_deref(), Some("reconstruction"));
    assert!(job.error_message.is_some());

    // Earlier stages completed, later stages never ran
    assert!(job.preprocessed_image.is_some());
    assert!(job.mesh_path.is_none());
    assert!(job.repaired_mesh_path.is_none());
    assert!(job.stl_path.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn matting_fallback_still_completes_the_job() {
    let harness = harness(ModelRegistry::without_matting(16, 64)).await;
    let job_id = upload_photo(&harness).await;

    Orchestrator::new(harness.ctx.clone()).run(job_id).await;

    let job = harness.ctx.store.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Done);
    // The pass-through image was still recorded as the stage artifact
    assert_eq!(job.preprocessed_image.as_deref(), Some("preprocessed.png"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scaled_export_leaves_canonical_artifact_alone() {
    let harness = harness(ModelRegistry::new(16, 64)).await;
    let job_id = upload_photo(&harness).await;
    Orchestrator::new(harness.ctx.clone()).run(job_id).await;

    let storage = &harness.ctx.storage;
    let canonical = storage.export_path(job_id, "model.stl").unwrap();
    let canonical_bytes = std::fs::read(&canonical).unwrap();

    let factors = pf_server::dimension::ScaleFactors {
        x: 2.0,
        y: 2.0,
        z: 2.0,
    };
    let name = pf_server::dimension::export_scaled(
        &harness.ctx.store,
        storage,
        job_id,
        &factors,
    )
    .await
    .unwrap();
    assert_eq!(name, "scaled_mesh_2.00x_2.00x_2.00x.stl");

    let scaled_path = storage.export_path(job_id, &name).unwrap();
    assert!(scaled_path.is_file());
    assert_eq!(std::fs::read(&canonical).unwrap(), canonical_bytes);

    // The scaled mesh's bounding box doubled along every axis
    let original = pf_mesh::load_mesh(&canonical).unwrap();
    let scaled = pf_mesh::load_mesh(&scaled_path).unwrap();
    let a = original.bounds().extent();
    let b = scaled.bounds().extent();
    assert!((b.x / a.x - 2.0).abs() < 0.01);
    assert!((b.y / a.y - 2.0).abs() < 0.01);
    assert!((b.z / a.z - 2.0).abs() < 0.01);

    let job = harness.ctx.store.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.scaled_exports, vec![name]);
}
