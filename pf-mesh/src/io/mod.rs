//! Mesh file I/O: STL, OBJ and PLY.
//!
//! `load_mesh`/`save_mesh` detect the format from the file extension.
//! Loading flattens multi-object containers into a single mesh and
//! fails with [`MeshError::EmptyScene`] when a file holds no geometry.
//! Saving creates parent directories as needed and surfaces write
//! failures instead of truncating.

mod obj;
mod ply;
mod stl;

pub use obj::{load_obj, save_obj};
pub use ply::{load_ply, save_ply};
pub use stl::{load_stl, save_stl};

use crate::error::{MeshError, MeshResult};
use crate::mesh::TriangleMesh;
use std::path::Path;

/// Supported interchange formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// Binary/ASCII triangle soup.
    Stl,
    /// Text format carrying vertex normals.
    Obj,
    /// Binary/ASCII, also usable for point clouds.
    Ply,
}

impl MeshFormat {
    /// Detect a format from a file extension (case-insensitive).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "stl" => Some(Self::Stl),
            "obj" => Some(Self::Obj),
            "ply" => Some(Self::Ply),
            _ => None,
        }
    }

    /// Detect a format from a path.
    pub fn from_path(path: &Path) -> MeshResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(extension).ok_or_else(|| MeshError::UnknownFormat {
            extension: extension.to_string(),
        })
    }
}

/// Load a mesh, detecting the format from the extension.
///
/// Multi-object files are flattened into one mesh; a file containing no
/// geometry is an error rather than an empty mesh.
pub fn load_mesh<P: AsRef<Path>>(path: P) -> MeshResult<TriangleMesh> {
    let path = path.as_ref();
    let mesh = match MeshFormat::from_path(path)? {
        MeshFormat::Stl => load_stl(path)?,
        MeshFormat::Obj => load_obj(path)?,
        MeshFormat::Ply => load_ply(path)?,
    };
    if mesh.faces.is_empty() {
        return Err(MeshError::EmptyScene {
            path: path.to_path_buf(),
        });
    }
    Ok(mesh)
}

/// Save a mesh in the given format, creating parent directories.
///
/// Binary encodings are used where the format offers one.
pub fn save_mesh<P: AsRef<Path>>(
    mesh: &TriangleMesh,
    path: P,
    format: MeshFormat,
) -> MeshResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    match format {
        MeshFormat::Stl => save_stl(mesh, path, true),
        MeshFormat::Obj => save_obj(mesh, path, true),
        MeshFormat::Ply => save_ply(mesh, path, true),
    }
}
