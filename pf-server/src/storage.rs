//! Filesystem layout for uploads and artifacts.
//!
//! ```text
//! <root>/uploads/<uuid>.<ext>      original photos
//! <root>/jobs/<job_id>/…           per-job intermediate artifacts
//! <root>/exports/<job_id>/…        canonical and scaled exports
//! ```

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Storage tree rooted at the configured storage directory.
#[derive(Debug, Clone)]
pub struct StorageDirs {
    root: PathBuf,
}

impl StorageDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory tree if missing.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.uploads())?;
        std::fs::create_dir_all(self.jobs())?;
        std::fs::create_dir_all(self.exports())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn jobs(&self) -> PathBuf {
        self.root.join("jobs")
    }

    pub fn exports(&self) -> PathBuf {
        self.root.join("exports")
    }

    pub fn upload_path(&self, filename: &str) -> PathBuf {
        self.uploads().join(filename)
    }

    /// Path of a per-job artifact, creating the job directory.
    pub fn job_path(&self, job_id: Uuid, filename: &str) -> std::io::Result<PathBuf> {
        let dir = self.jobs().join(job_id.to_string());
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(filename))
    }

    /// Path of an export artifact, creating the export directory.
    pub fn export_path(&self, job_id: Uuid, filename: &str) -> std::io::Result<PathBuf> {
        let dir = self.exports().join(job_id.to_string());
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(filename))
    }

    /// URL under which a job artifact is served.
    pub fn job_url(job_id: Uuid, filename: &str) -> String {
        format!("/api/files/jobs/{job_id}/{filename}")
    }

    /// URL under which an export is served.
    pub fn export_url(job_id: Uuid, filename: &str) -> String {
        format!("/api/files/exports/{job_id}/{filename}")
    }
}
