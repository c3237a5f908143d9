//! Mesh analysis, repair and interchange for FDM printing.
//!
//! This crate holds the geometry half of photoforge: an indexed triangle
//! mesh model with derived properties, a printability validator
//! (watertightness, manifoldness, degenerate faces, ray-cast wall
//! thickness), a fixed-order repair pipeline, and STL/OBJ/PLY I/O with
//! dimension rescaling.
//!
//! The validator and repairer never mutate their input; callers re-run
//! [`validate`] after [`repair`] to decide whether a mesh is printable.

pub mod adjacency;
pub mod error;
pub mod io;
pub mod mesh;
pub mod repair;
pub mod shapes;
pub mod thickness;
pub mod validate;

pub use adjacency::EdgeAdjacency;
pub use error::{MeshError, MeshResult};
pub use io::{load_mesh, save_mesh, MeshFormat};
pub use mesh::{Aabb, Triangle, TriangleMesh};
pub use repair::{repair, RepairOptions, RepairSummary};
pub use thickness::{analyze_thickness, ThicknessOptions, ThicknessReport};
pub use validate::{validate, ValidateOptions, ValidationReport};

pub use nalgebra::{Point3, Vector3};
