//! Job store integration tests against a real SQLite file.

use pf_server::jobs::{JobRecord, JobStatus, JobStore, JobUpdate};
use tempfile::TempDir;

async fn store_with_ttl(ttl_seconds: i64) -> (JobStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::connect(&dir.path().join("jobs.db"), ttl_seconds)
        .await
        .unwrap();
    (store, dir)
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let (store, _dir) = store_with_ttl(3600).await;
    let record = JobRecord::new("photo.png".into());
    store.create(&record).await.unwrap();

    let loaded = store.get(record.id).await.unwrap().expect("job exists");
    assert_eq!(loaded, record);
}

#[tokio::test]
async fn absent_job_is_none() {
    let (store, _dir) = store_with_ttl(3600).await;
    assert!(store.get(uuid::Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_merges_fields_and_touches_updated_at() {
    let (store, _dir) = store_with_ttl(3600).await;
    let record = JobRecord::new("photo.png".into());
    store.create(&record).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let updated = store
        .update(
            record.id,
            JobUpdate {
                mesh_path: Some("raw_mesh.ply".into()),
                progress: Some(65),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .expect("job exists");

    assert_eq!(updated.mesh_path.as_deref(), Some("raw_mesh.ply"));
    assert_eq!(updated.progress, 65);
    assert!(updated.updated_at > record.updated_at);
    // Untouched fields survive
    assert_eq!(updated.image_path, "photo.png");

    // The stored copy matches what update returned
    let loaded = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(loaded, updated);
}

#[tokio::test]
async fn progress_is_monotonic_across_updates() {
    let (store, _dir) = store_with_ttl(3600).await;
    let record = JobRecord::new("photo.png".into());
    store.create(&record).await.unwrap();

    store.set_progress(record.id, 40).await.unwrap();
    store.set_progress(record.id, 20).await.unwrap();
    let loaded = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(loaded.progress, 40);
}

#[tokio::test]
async fn expired_jobs_report_not_found() {
    let (store, _dir) = store_with_ttl(0).await;
    let record = JobRecord::new("photo.png".into());
    store.create(&record).await.unwrap();

    assert!(store.get(record.id).await.unwrap().is_none());
    // Updates refuse expired records too
    let updated = store
        .update(record.id, JobUpdate::progress(50))
        .await
        .unwrap();
    assert!(updated.is_none());
}

#[tokio::test]
async fn sweep_removes_expired_rows() {
    let (store, _dir) = store_with_ttl(0).await;
    let record = JobRecord::new("photo.png".into());
    store.create(&record).await.unwrap();

    let swept = store.sweep_expired().await.unwrap();
    assert_eq!(swept, 1);
    assert_eq!(store.sweep_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn live_jobs_survive_sweeps() {
    let (store, _dir) = store_with_ttl(3600).await;
    let record = JobRecord::new("photo.png".into());
    store.create(&record).await.unwrap();

    assert_eq!(store.sweep_expired().await.unwrap(), 0);
    assert!(store.get(record.id).await.unwrap().is_some());
}

#[tokio::test]
async fn set_error_records_stage_and_status() {
    let (store, _dir) = store_with_ttl(3600).await;
    let record = JobRecord::new("photo.png".into());
    store.create(&record).await.unwrap();

    store
        .set_error(record.id, "model exploded", "reconstruction")
        .await
        .unwrap();
    let loaded = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Error);
    assert_eq!(loaded.error_message.as_deref(), Some("model exploded"));
    assert_eq!(loaded.error_stage.as_deref(), Some("reconstruction"));
    assert!(loaded.status.is_terminal());
}

#[tokio::test]
async fn concurrent_updates_all_land() {
    let (store, _dir) = store_with_ttl(3600).await;
    let record = JobRecord::new("photo.png".into());
    store.create(&record).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..10u8 {
        let store = store.clone();
        let id = record.id;
        handles.push(tokio::spawn(async move {
            store.set_progress(id, i * 10).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let loaded = store.get(record.id).await.unwrap().unwrap();
    // Whatever the interleaving, the record is intact and progress is
    // the maximum written
    assert_eq!(loaded.progress, 90);
    assert_eq!(loaded.status, JobStatus::Uploaded);
}
