//! Common error types for photoforge

use thiserror::Error;

/// Common result type for photoforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the photoforge crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A named pipeline stage failed; recorded on the job, never retried
    /// past the orchestrator's bounded attempts
    #[error("Processing failed at {stage}: {message}")]
    Processing { stage: String, message: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a stage-tagged processing error.
    pub fn processing(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Processing {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// The stage tag, when this is a processing error.
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::Processing { stage, .. } => Some(stage),
            _ => None,
        }
    }
}
