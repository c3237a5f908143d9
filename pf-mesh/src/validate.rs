//! Printability validation.

use crate::adjacency::EdgeAdjacency;
use crate::mesh::TriangleMesh;
use crate::thickness::{analyze_thickness, ThicknessOptions, ThicknessReport};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Options controlling validation thresholds.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Area below which a face counts as degenerate.
    pub degenerate_area_threshold: f64,
    /// Wall thickness sampling parameters.
    pub thickness: ThicknessOptions,
    /// Skip the (expensive) wall thickness analysis entirely.
    pub skip_thickness: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            degenerate_area_threshold: 1e-10,
            thickness: ThicknessOptions::default(),
            skip_thickness: false,
        }
    }
}

/// Result of validating one mesh. Produced fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Every unique edge is incident to exactly two faces.
    pub watertight: bool,
    /// Same edge condition; no self-intersection analysis is attempted.
    pub manifold: bool,
    /// Number of faces with effectively zero area.
    pub degenerate_faces: usize,
    /// Wall thickness analysis, present only for watertight meshes.
    pub wall_thickness: Option<ThicknessReport>,
    /// `watertight && manifold && degenerate_faces == 0`.
    pub is_valid: bool,
}

/// Run all printability checks. Never mutates the mesh and never fails
/// on structurally valid input; a thickness analysis problem degrades to
/// omitting that field.
pub fn validate(mesh: &TriangleMesh, options: &ValidateOptions) -> ValidationReport {
    let adjacency = EdgeAdjacency::build(&mesh.faces);
    let closed = adjacency.every_edge_has_two_faces();
    let watertight = !mesh.faces.is_empty() && closed;
    let manifold = watertight;

    let degenerate_faces = count_degenerate_faces(mesh, options.degenerate_area_threshold);

    // The ray-cast analysis is only meaningful on a closed surface
    let wall_thickness = if watertight && !options.skip_thickness {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            analyze_thickness(mesh, &options.thickness)
        })) {
            Ok(report) => Some(report),
            Err(_) => {
                warn!("wall thickness analysis failed, omitting from report");
                None
            }
        }
    } else {
        None
    };

    let report = ValidationReport {
        watertight,
        manifold,
        degenerate_faces,
        wall_thickness,
        is_valid: watertight && manifold && degenerate_faces == 0,
    };

    debug!(
        watertight = report.watertight,
        manifold = report.manifold,
        degenerate = report.degenerate_faces,
        valid = report.is_valid,
        "mesh validation complete"
    );

    report
}

fn count_degenerate_faces(mesh: &TriangleMesh, area_threshold: f64) -> usize {
    mesh.triangles()
        .filter(|tri| tri.area() < area_threshold)
        .count()
}
