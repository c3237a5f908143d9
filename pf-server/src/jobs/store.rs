//! TTL-bound job store on SQLite.
//!
//! Each job is one row holding the JSON-serialized [`JobRecord`].
//! Updates run as a read-merge-write inside a single transaction, so a
//! concurrent status poll can never observe a half-applied record. TTL
//! is fixed at creation: updates refresh `updated_at` but never shrink
//! or extend `expires_at` (it is reset to the default only when the
//! stored value cannot be parsed).

use crate::jobs::{JobRecord, JobStatus, JobUpdate};
use chrono::{DateTime, Duration, Utc};
use pf_common::{Error, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Key-value store of job records with expiry.
#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
    ttl_seconds: i64,
}

impl JobStore {
    /// Open (or create) the backing database and initialize the schema.
    pub async fn connect(db_path: &Path, ttl_seconds: i64) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        debug!("Connecting to job database: {}", db_url);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;
        let store = Self::new(pool, ttl_seconds);
        store.init_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool (used by tests).
    pub fn new(pool: SqlitePool, ttl_seconds: i64) -> Self {
        Self { pool, ttl_seconds }
    }

    /// Create the jobs table when missing.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                job_id TEXT PRIMARY KEY,
                record TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a new record with a fresh TTL.
    pub async fn create(&self, record: &JobRecord) -> Result<()> {
        let payload = serde_json::to_string(record)
            .map_err(|e| Error::Internal(format!("serialize job record: {e}")))?;
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.ttl_seconds);
        sqlx::query(
            "INSERT INTO jobs (job_id, record, created_at, updated_at, expires_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(payload)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        info!(job_id = %record.id, "created job");
        Ok(())
    }

    /// Fetch a record; `None` when absent or expired.
    pub async fn get(&self, id: Uuid) -> Result<Option<JobRecord>> {
        let row = sqlx::query("SELECT record, expires_at FROM jobs WHERE job_id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        if is_expired(&row.get::<String, _>("expires_at")) {
            return Ok(None);
        }
        let payload: String = row.get("record");
        let record = serde_json::from_str(&payload)
            .map_err(|e| Error::Internal(format!("corrupt job record {id}: {e}")))?;
        Ok(Some(record))
    }

    /// Merge a partial update into a record, atomically.
    ///
    /// The read-merge-write runs under `BEGIN IMMEDIATE`, which takes
    /// the SQLite write lock before the read; two concurrent updates of
    /// the same job therefore serialize instead of overwriting each
    /// other from stale reads. Returns the updated record, or `None`
    /// when the job is absent or expired.
    pub async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Option<JobRecord>> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        match self.update_locked(&mut conn, id, update).await {
            Ok(result) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(result)
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn update_locked(
        &self,
        conn: &mut sqlx::SqliteConnection,
        id: Uuid,
        update: JobUpdate,
    ) -> Result<Option<JobRecord>> {
        let row = sqlx::query("SELECT record, expires_at FROM jobs WHERE job_id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let stored_expiry: String = row.get("expires_at");
        if is_expired(&stored_expiry) {
            return Ok(None);
        }

        let payload: String = row.get("record");
        let mut record: JobRecord = serde_json::from_str(&payload)
            .map_err(|e| Error::Internal(format!("corrupt job record {id}: {e}")))?;
        record.apply(update);
        let now = Utc::now();
        record.updated_at = now;

        // TTL is preserved as-is; only an unreadable value is replaced
        let expires_at = match DateTime::parse_from_rfc3339(&stored_expiry) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(_) => {
                warn!(job_id = %id, "unreadable job expiry, resetting to default TTL");
                now + Duration::seconds(self.ttl_seconds)
            }
        };

        let payload = serde_json::to_string(&record)
            .map_err(|e| Error::Internal(format!("serialize job record: {e}")))?;
        sqlx::query("UPDATE jobs SET record = ?, updated_at = ?, expires_at = ? WHERE job_id = ?")
            .bind(payload)
            .bind(now.to_rfc3339())
            .bind(expires_at.to_rfc3339())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;

        Ok(Some(record))
    }

    /// Update status and optionally progress.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: JobStatus,
        progress: Option<u8>,
    ) -> Result<Option<JobRecord>> {
        info!(job_id = %id, status = ?status, progress = ?progress, "job status");
        let mut update = JobUpdate::status(status);
        update.progress = progress;
        self.update(id, update).await
    }

    /// Update progress only.
    pub async fn set_progress(&self, id: Uuid, progress: u8) -> Result<Option<JobRecord>> {
        self.update(id, JobUpdate::progress(progress)).await
    }

    /// Move the job to ERROR with an attributable stage tag.
    pub async fn set_error(
        &self,
        id: Uuid,
        message: &str,
        stage: &str,
    ) -> Result<Option<JobRecord>> {
        error!(job_id = %id, stage, message, "job failed");
        self.update(
            id,
            JobUpdate {
                status: Some(JobStatus::Error),
                error_message: Some(message.to_string()),
                error_stage: Some(stage.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Delete expired rows. Returns the number removed.
    pub async fn sweep_expired(&self) -> Result<u64> {
        let swept = sqlx::query("DELETE FROM jobs WHERE expires_at <= ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if swept > 0 {
            info!(swept, "swept expired jobs");
        }
        Ok(swept)
    }

    /// Run the expiry sweep on an interval until the process exits.
    pub fn spawn_sweeper(&self, interval_seconds: u64) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(interval_seconds.max(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = store.sweep_expired().await {
                    warn!(error = %e, "job sweep failed");
                }
            }
        })
    }
}

fn is_expired(expires_at: &str) -> bool {
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(parsed) => parsed.with_timezone(&Utc) <= Utc::now(),
        // Unreadable expiry is treated as live; the next update rewrites it
        Err(_) => false,
    }
}
