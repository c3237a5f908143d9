//! Job record and status model.

use chrono::{DateTime, Utc};
use pf_mesh::ValidationReport;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job lifecycle states. DONE and ERROR are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded,
    GeneratingMultiAngles,
    Preprocessing,
    #[serde(rename = "reconstructing_3d")]
    Reconstructing3d,
    RenderingPreviews,
    MeshRepairing,
    ExportingStl,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// Millimeter dimensions of an exported mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Post-export mesh analysis stored on the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisData {
    pub watertight: bool,
    pub manifold: bool,
    pub dimensions: Dimensions,
    /// Enclosed volume in mm³; 0.0 when the mesh is not watertight.
    pub volume: f64,
    pub surface_area: f64,
    pub vertices: usize,
    pub faces: usize,
    pub validation: ValidationReport,
}

/// The durable, TTL-bound state object tracking one upload.
///
/// Artifact fields are relative paths inside the job's storage
/// directories; stages read their inputs from these named fields, never
/// from a previous stage's return value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub status: JobStatus,
    /// 0–100, monotonically non-decreasing over the job's life.
    pub progress: u8,

    /// Uploaded source image, relative to the uploads directory.
    pub image_path: String,
    /// Generated view images, relative to the job directory.
    #[serde(default)]
    pub multi_angle_images: Vec<String>,
    pub preprocessed_image: Option<String>,
    /// Raw reconstructed mesh, relative to the job directory.
    pub mesh_path: Option<String>,
    pub repaired_mesh_path: Option<String>,
    #[serde(default)]
    pub preview_images: Vec<String>,
    /// Canonical exports, relative to the export directory.
    pub stl_path: Option<String>,
    pub obj_path: Option<String>,
    /// Scaled exports produced by the dimension service.
    #[serde(default)]
    pub scaled_exports: Vec<String>,

    pub error_message: Option<String>,
    pub error_stage: Option<String>,
    pub analysis_data: Option<AnalysisData>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Fresh record for a newly uploaded image.
    pub fn new(image_path: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Uploaded,
            progress: 0,
            image_path,
            multi_angle_images: Vec::new(),
            preprocessed_image: None,
            mesh_path: None,
            repaired_mesh_path: None,
            preview_images: Vec::new(),
            stl_path: None,
            obj_path: None,
            scaled_exports: Vec::new(),
            error_message: None,
            error_stage: None,
            analysis_data: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update into this record.
    ///
    /// Progress never moves backwards and is clamped to 100.
    pub fn apply(&mut self, update: JobUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = self.progress.max(progress.min(100));
        }
        if let Some(images) = update.multi_angle_images {
            self.multi_angle_images = images;
        }
        if let Some(path) = update.preprocessed_image {
            self.preprocessed_image = Some(path);
        }
        if let Some(path) = update.mesh_path {
            self.mesh_path = Some(path);
        }
        if let Some(path) = update.repaired_mesh_path {
            self.repaired_mesh_path = Some(path);
        }
        if let Some(images) = update.preview_images {
            self.preview_images = images;
        }
        if let Some(path) = update.stl_path {
            self.stl_path = Some(path);
        }
        if let Some(path) = update.obj_path {
            self.obj_path = Some(path);
        }
        if let Some(path) = update.push_scaled_export {
            if !self.scaled_exports.contains(&path) {
                self.scaled_exports.push(path);
            }
        }
        if let Some(message) = update.error_message {
            self.error_message = Some(message);
        }
        if let Some(stage) = update.error_stage {
            self.error_stage = Some(stage);
        }
        if let Some(analysis) = update.analysis_data {
            self.analysis_data = Some(analysis);
        }
    }
}

/// Partial update merged into a [`JobRecord`] by the store.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub multi_angle_images: Option<Vec<String>>,
    pub preprocessed_image: Option<String>,
    pub mesh_path: Option<String>,
    pub repaired_mesh_path: Option<String>,
    pub preview_images: Option<Vec<String>>,
    pub stl_path: Option<String>,
    pub obj_path: Option<String>,
    pub push_scaled_export: Option<String>,
    pub error_message: Option<String>,
    pub error_stage: Option<String>,
    pub analysis_data: Option<AnalysisData>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_starts_uploaded() {
        let record = JobRecord::new("abc.png".into());
        assert_eq!(record.status, JobStatus::Uploaded);
        assert_eq!(record.progress, 0);
        assert!(!record.status.is_terminal());
    }

    #[test]
    fn progress_never_decreases() {
        let mut record = JobRecord::new("abc.png".into());
        record.apply(JobUpdate::progress(40));
        record.apply(JobUpdate::progress(25));
        assert_eq!(record.progress, 40);
        record.apply(JobUpdate::progress(130));
        assert_eq!(record.progress, 100);
    }

    #[test]
    fn apply_merges_only_given_fields() {
        let mut record = JobRecord::new("abc.png".into());
        record.apply(JobUpdate {
            mesh_path: Some("raw_mesh.ply".into()),
            ..Default::default()
        });
        assert_eq!(record.mesh_path.as_deref(), Some("raw_mesh.ply"));
        assert_eq!(record.status, JobStatus::Uploaded);
        assert!(record.stl_path.is_none());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::GeneratingMultiAngles).unwrap();
        assert_eq!(json, "\"generating_multi_angles\"");
        let json = serde_json::to_string(&JobStatus::Reconstructing3d).unwrap();
        assert_eq!(json, "\"reconstructing_3d\"");
    }

    #[test]
    fn scaled_exports_deduplicate() {
        let mut record = JobRecord::new("abc.png".into());
        for _ in 0..2 {
            record.apply(JobUpdate {
                push_scaled_export: Some("scaled_mesh_2.00x_2.00x_2.00x.stl".into()),
                ..Default::default()
            });
        }
        assert_eq!(record.scaled_exports.len(), 1);
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = JobRecord::new("abc.png".into());
        let json = serde_json::to_string(&record).unwrap();
        let back: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
