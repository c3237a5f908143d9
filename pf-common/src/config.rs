//! Service configuration loading
//!
//! Resolution priority follows the usual order: programmatic override
//! (CLI) > environment variable > TOML config file > compiled default.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime configuration for the photoforge server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Bind address for the HTTP server
    pub host: String,
    /// Bind port for the HTTP server
    pub port: u16,

    /// Root directory holding uploads/, jobs/ and exports/
    pub storage_root: PathBuf,
    /// SQLite database file, relative to storage_root when not absolute
    pub database_file: PathBuf,

    /// Seconds a job record lives after creation
    pub job_ttl_seconds: i64,
    /// How often the expiry sweeper runs
    pub sweep_interval_seconds: u64,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
    /// Accepted upload file extensions (lowercase, without dot)
    pub allowed_extensions: Vec<String>,

    /// Concurrency of the CPU-bound geometry queue
    pub cpu_workers: usize,
    /// Per-attempt stage timeout in seconds
    pub stage_timeout_seconds: u64,
    /// Retries after the first failed attempt of a stage
    pub stage_retries: u32,
    /// Fixed backoff between stage attempts, milliseconds
    pub retry_backoff_ms: u64,

    /// Minimum printable wall thickness in millimeters
    pub min_wall_thickness_mm: f64,
    /// Grid resolution of the built-in relief reconstruction backend
    pub mesh_resolution: u32,
    /// Preview render edge length in pixels
    pub preview_size: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5850,
            storage_root: PathBuf::from("./storage"),
            database_file: PathBuf::from("photoforge.db"),
            job_ttl_seconds: 24 * 60 * 60,
            sweep_interval_seconds: 300,
            max_upload_bytes: 16 * 1024 * 1024,
            allowed_extensions: ["png", "jpg", "jpeg", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cpu_workers: 4,
            stage_timeout_seconds: 120,
            stage_retries: 2,
            retry_backoff_ms: 500,
            min_wall_thickness_mm: 1.2,
            mesh_resolution: 256,
            preview_size: 512,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Resolve configuration: explicit file if given, otherwise
    /// `PHOTOFORGE_CONFIG` from the environment, otherwise defaults.
    pub fn resolve(config_file: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_file {
            tracing::info!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var("PHOTOFORGE_CONFIG") {
            tracing::info!("Loading configuration from {path} (PHOTOFORGE_CONFIG)");
            return Self::from_file(Path::new(&path));
        }
        tracing::debug!("No configuration file, using defaults");
        Ok(Self::default())
    }

    /// Absolute database path (joined to the storage root when relative).
    pub fn database_path(&self) -> PathBuf {
        if self.database_file.is_absolute() {
            self.database_file.clone()
        } else {
            self.storage_root.join(&self.database_file)
        }
    }

    /// Check an upload extension against the allow-list.
    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|e| *e == ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = ServiceConfig::default();
        assert_eq!(config.job_ttl_seconds, 86400);
        assert!(config.is_allowed_extension("PNG"));
        assert!(!config.is_allowed_extension("gif"));
        assert_eq!(config.cpu_workers, 4);
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "port = 9999\nmin_wall_thickness_mm = 0.8").unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.port, 9999);
        assert!((config.min_wall_thickness_mm - 0.8).abs() < 1e-12);
        // Untouched fields keep their defaults
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn database_path_joins_relative_files() {
        let config = ServiceConfig {
            storage_root: PathBuf::from("/data"),
            database_file: PathBuf::from("jobs.db"),
            ..Default::default()
        };
        assert_eq!(config.database_path(), PathBuf::from("/data/jobs.db"));
    }

    #[test]
    fn bad_file_is_a_config_error() {
        let err = ServiceConfig::from_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
