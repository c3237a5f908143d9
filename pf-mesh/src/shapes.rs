//! Reference shapes used by tests and fallbacks.

use crate::mesh::TriangleMesh;
use nalgebra::Point3;

/// Closed unit cube, 8 vertices and 12 CCW-wound triangles.
pub fn unit_cube() -> TriangleMesh {
    cube(1.0)
}

/// Closed axis-aligned cube with the given edge length, corner at origin.
pub fn cube(size: f64) -> TriangleMesh {
    let s = size;
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(s, 0.0, 0.0),
        Point3::new(s, s, 0.0),
        Point3::new(0.0, s, 0.0),
        Point3::new(0.0, 0.0, s),
        Point3::new(s, 0.0, s),
        Point3::new(s, s, s),
        Point3::new(0.0, s, s),
    ];
    let faces = vec![
        // bottom
        [0, 2, 1],
        [0, 3, 2],
        // front
        [0, 1, 5],
        [0, 5, 4],
        // right
        [1, 2, 6],
        [1, 6, 5],
        // back
        [2, 3, 7],
        [2, 7, 6],
        // left
        [3, 0, 4],
        [3, 4, 7],
        // top
        [4, 5, 6],
        [4, 6, 7],
    ];
    TriangleMesh::from_parts(vertices, faces)
}

/// Unit cube missing its top face: one square boundary loop at z=1.
pub fn open_box() -> TriangleMesh {
    let mut mesh = cube(1.0);
    mesh.faces.truncate(10);
    mesh
}

/// Watertight box shell with a cavity, giving a uniform wall thickness.
///
/// The outer cube spans `[0, outer]³`; the inner cavity is inset by
/// `wall` on every side. Inner faces are wound toward the cavity so the
/// solid material lies between the shells.
pub fn hollow_box(outer: f64, wall: f64) -> TriangleMesh {
    let mut mesh = cube(outer);
    let lo = wall;
    let hi = outer - wall;
    let base = mesh.vertices.len() as u32;
    mesh.vertices.extend([
        Point3::new(lo, lo, lo),
        Point3::new(hi, lo, lo),
        Point3::new(hi, hi, lo),
        Point3::new(lo, hi, lo),
        Point3::new(lo, lo, hi),
        Point3::new(hi, lo, hi),
        Point3::new(hi, hi, hi),
        Point3::new(lo, hi, hi),
    ]);
    // Same quads as the cube but with reversed winding
    let inner_faces = [
        [0, 1, 2],
        [0, 2, 3],
        [0, 5, 1],
        [0, 4, 5],
        [1, 6, 2],
        [1, 5, 6],
        [2, 7, 3],
        [2, 6, 7],
        [3, 4, 0],
        [3, 7, 4],
        [4, 6, 5],
        [4, 7, 6],
    ];
    mesh.faces
        .extend(inner_faces.iter().map(|f| [f[0] + base, f[1] + base, f[2] + base]));
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::EdgeAdjacency;

    #[test]
    fn unit_cube_is_closed() {
        let cube = unit_cube();
        let adj = EdgeAdjacency::build(&cube.faces);
        assert!(adj.every_edge_has_two_faces());
        assert!((cube.signed_volume() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn open_box_has_one_square_hole() {
        let mesh = open_box();
        let adj = EdgeAdjacency::build(&mesh.faces);
        assert_eq!(adj.boundary_edge_count(), 4);
    }

    #[test]
    fn hollow_box_is_closed_with_expected_volume() {
        let mesh = hollow_box(10.0, 1.0);
        let adj = EdgeAdjacency::build(&mesh.faces);
        assert!(adj.every_edge_has_two_faces());
        let expected = 1000.0 - 8.0f64.powi(3);
        assert!((mesh.signed_volume() - expected).abs() < 1e-6);
    }
}
