//! Indexed triangle mesh and derived geometric properties.

use crate::error::{MeshError, MeshResult};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A single triangle in 3D space.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub a: Point3<f64>,
    pub b: Point3<f64>,
    pub c: Point3<f64>,
}

impl Triangle {
    pub fn new(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Self {
        Self { a, b, c }
    }

    /// Triangle area (half the cross product norm).
    pub fn area(&self) -> f64 {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        e1.cross(&e2).norm() * 0.5
    }

    /// Unit normal by the right-hand rule, `None` for degenerate triangles.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let cross = e1.cross(&e2);
        let len = cross.norm();
        if len > f64::EPSILON {
            Some(cross / len)
        } else {
            None
        }
    }

    pub fn centroid(&self) -> Point3<f64> {
        Point3::new(
            (self.a.x + self.b.x + self.c.x) / 3.0,
            (self.a.y + self.b.y + self.c.y) / 3.0,
            (self.a.z + self.b.z + self.c.z) / 3.0,
        )
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Box spanning no space, used as the empty-mesh bounds.
    pub fn empty() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }

    /// Per-axis extent.
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the box diagonal.
    pub fn diagonal(&self) -> f64 {
        self.extent().norm()
    }
}

/// An indexed triangle mesh.
///
/// Faces use counter-clockwise winding when viewed from outside, so face
/// normals point outward by the right-hand rule. Per-vertex normals are
/// optional and carried through repair operations when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,
    /// Triangle faces as indices into `vertices`.
    pub faces: Vec<[u32; 3]>,
    /// Optional per-vertex unit normals (same length as `vertices`).
    pub normals: Option<Vec<Vector3<f64>>>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            normals: None,
        }
    }

    pub fn from_parts(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Verify every face references a valid vertex and the mesh has faces.
    ///
    /// Every operation other than loading requires this to hold.
    pub fn check(&self) -> MeshResult<()> {
        if self.faces.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        let vertex_count = self.vertices.len();
        for (face_idx, face) in self.faces.iter().enumerate() {
            for &index in face {
                if index as usize >= vertex_count {
                    return Err(MeshError::FaceIndexOutOfBounds {
                        face: face_idx,
                        index,
                        vertex_count,
                    });
                }
            }
        }
        Ok(())
    }

    /// The triangle for face `idx`.
    pub fn triangle(&self, idx: usize) -> Triangle {
        let [i0, i1, i2] = self.faces[idx];
        Triangle::new(
            self.vertices[i0 as usize],
            self.vertices[i1 as usize],
            self.vertices[i2 as usize],
        )
    }

    /// Iterate over all face triangles.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.faces.len()).map(|i| self.triangle(i))
    }

    /// Area of face `idx`.
    pub fn face_area(&self, idx: usize) -> f64 {
        self.triangle(idx).area()
    }

    /// Sum of all face areas.
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|t| t.area()).sum()
    }

    /// Axis-aligned bounding box of all vertices.
    pub fn bounds(&self) -> Aabb {
        let mut iter = self.vertices.iter();
        let Some(first) = iter.next() else {
            return Aabb::empty();
        };
        let mut min = *first;
        let mut max = *first;
        for v in iter {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }
        Aabb { min, max }
    }

    /// Characteristic scale: bounding-box diagonal length.
    pub fn characteristic_scale(&self) -> f64 {
        self.bounds().diagonal()
    }

    /// Signed enclosed volume via the divergence theorem.
    ///
    /// Positive for a closed mesh with outward normals; only meaningful
    /// when the mesh is watertight.
    pub fn signed_volume(&self) -> f64 {
        let mut volume = 0.0;
        for &[i0, i1, i2] in &self.faces {
            let v0 = &self.vertices[i0 as usize];
            let v1 = &self.vertices[i1 as usize];
            let v2 = &self.vertices[i2 as usize];
            volume += v0.x * (v1.y * v2.z - v2.y * v1.z)
                + v1.x * (v2.y * v0.z - v0.y * v2.z)
                + v2.x * (v0.y * v1.z - v1.y * v0.z);
        }
        volume / 6.0
    }

    /// Absolute enclosed volume.
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Apply independent per-axis scale factors to all vertex positions.
    ///
    /// Pure geometric transform with no topology change. Vertex normals,
    /// when present, are transformed with the inverse scale and
    /// renormalized so they stay perpendicular under non-uniform scaling.
    pub fn apply_scale(&mut self, factors: Vector3<f64>) {
        for v in &mut self.vertices {
            v.x *= factors.x;
            v.y *= factors.y;
            v.z *= factors.z;
        }
        if let Some(normals) = &mut self.normals {
            for n in normals.iter_mut() {
                if factors.x != 0.0 {
                    n.x /= factors.x;
                }
                if factors.y != 0.0 {
                    n.y /= factors.y;
                }
                if factors.z != 0.0 {
                    n.z /= factors.z;
                }
                let len = n.norm();
                if len > f64::EPSILON {
                    *n /= len;
                }
            }
        }
    }

    /// Append all geometry from `other`, offsetting its face indices.
    pub fn append(&mut self, other: &TriangleMesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.faces
            .extend(other.faces.iter().map(|f| [f[0] + base, f[1] + base, f[2] + base]));
        // Mixed normal presence drops normals rather than inventing them
        match (&mut self.normals, &other.normals) {
            (Some(ours), Some(theirs)) => ours.extend_from_slice(theirs),
            (Some(_), None) => self.normals = None,
            (None, _) => {}
        }
    }
}
