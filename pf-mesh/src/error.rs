//! Error types for mesh operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors raised by mesh loading, saving and repair.
#[derive(Debug, Error)]
pub enum MeshError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Unrecognized file extension.
    #[error("unknown mesh format: .{extension}")]
    UnknownFormat { extension: String },

    /// Parse error in file content.
    #[error("invalid mesh file: {message}")]
    InvalidContent { message: String },

    /// A loaded container held no geometry at all.
    #[error("no geometry found in {path}")]
    EmptyScene { path: PathBuf },

    /// Operation requires a mesh with at least one face.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references a vertex index outside the vertex array.
    #[error("face {face} references vertex {index} but mesh has {vertex_count} vertices")]
    FaceIndexOutOfBounds {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    /// Hole filling could not triangulate a boundary loop.
    #[error("hole filling failed: {reason}")]
    HoleFillFailed { reason: String },

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Number parsing error in a text format.
    #[error("number parse error: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),

    /// Integer parsing error in a text format.
    #[error("number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
}

impl MeshError {
    /// Create an `InvalidContent` error with the given message.
    pub fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }
}
