//! Wall thickness estimation via inward ray casting.
//!
//! Samples points on the mesh surface proportionally to face area, casts
//! a ray from each sample inward (opposite the face normal) and records
//! the distance to the first opposing intersection. Rays that miss, rays
//! that travel further than half the mesh's characteristic scale (they
//! exited through a far wall rather than crossing a local cavity), and
//! hits on the sample's own face are discarded.

use crate::mesh::{Triangle, TriangleMesh};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Ray origins start this far inside the material, along the inward
/// normal. Together with the source-face skip this guards against rays
/// re-hitting the surface they were cast from.
const ORIGIN_OFFSET: f64 = 1e-3;

/// Minimum accepted ray parameter past the origin offset.
const MIN_HIT_DISTANCE: f64 = 1e-6;

/// Numerical epsilon for intersection tests.
const EPSILON: f64 = 1e-9;

/// Options for thickness analysis.
#[derive(Debug, Clone)]
pub struct ThicknessOptions {
    /// Number of surface samples.
    pub samples: usize,
    /// Thickness threshold in mesh units (millimeters).
    pub min_thickness_mm: f64,
    /// RNG seed for surface sampling; fixed so analysis is reproducible.
    pub seed: u64,
}

impl Default for ThicknessOptions {
    fn default() -> Self {
        Self {
            samples: 1000,
            min_thickness_mm: 1.2,
            seed: 0x7076_f0e5,
        }
    }
}

/// Result of a thickness analysis.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ThicknessReport {
    /// Smallest measured wall thickness, `None` when no ray produced a
    /// usable measurement.
    pub min_mm: Option<f64>,
    /// Mean of the usable measurements.
    pub avg_mm: Option<f64>,
    /// Number of samples measuring below the threshold.
    pub thin_samples: usize,
    /// True when the minimum measurement meets the threshold.
    pub passes: bool,
}

impl ThicknessReport {
    fn no_measurements() -> Self {
        Self {
            min_mm: None,
            avg_mm: None,
            thin_samples: 0,
            passes: false,
        }
    }
}

/// Estimate wall thickness over the mesh surface.
///
/// Callers are expected to invoke this only on watertight meshes; on
/// open geometry most rays simply miss and the report degrades to
/// [`ThicknessReport::no_measurements`] semantics.
pub fn analyze_thickness(mesh: &TriangleMesh, options: &ThicknessOptions) -> ThicknessReport {
    if mesh.faces.is_empty() || options.samples == 0 {
        return ThicknessReport::no_measurements();
    }

    let triangles: Vec<Triangle> = mesh.triangles().collect();

    // Area-weighted cumulative distribution over faces
    let mut cumulative = Vec::with_capacity(triangles.len());
    let mut total_area = 0.0;
    for tri in &triangles {
        total_area += tri.area();
        cumulative.push(total_area);
    }
    if total_area <= 0.0 {
        return ThicknessReport::no_measurements();
    }

    let mut indices: Vec<usize> = (0..triangles.len()).collect();
    let Some(bvh) = BvhNode::build(&triangles, &mut indices) else {
        return ThicknessReport::no_measurements();
    };

    // Draw samples sequentially so the seed fully determines them
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut samples = Vec::with_capacity(options.samples);
    for _ in 0..options.samples {
        let r: f64 = rng.gen_range(0.0..total_area);
        let face_idx = match cumulative.partition_point(|&c| c < r) {
            idx if idx < triangles.len() => idx,
            _ => triangles.len() - 1,
        };
        let tri = &triangles[face_idx];
        let Some(normal) = tri.normal() else {
            continue; // degenerate face carries no usable sample
        };
        let mut u: f64 = rng.gen();
        let mut v: f64 = rng.gen();
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        let point = tri.a + (tri.b - tri.a) * u + (tri.c - tri.a) * v;
        samples.push((point, normal, face_idx));
    }

    let max_distance = mesh.characteristic_scale() * 0.5;

    let distances: Vec<f64> = samples
        .par_iter()
        .filter_map(|&(point, normal, face_idx)| {
            let direction = -normal;
            let origin = point + direction * ORIGIN_OFFSET;
            let dir_inv = invert_direction(&direction);
            trace_ray(
                &bvh,
                &origin,
                &direction,
                &dir_inv,
                &triangles,
                max_distance,
                face_idx,
            )
            // Measure from the surface point, not the offset origin
            .map(|t| t + ORIGIN_OFFSET)
        })
        .collect();

    if distances.is_empty() {
        return ThicknessReport::no_measurements();
    }

    let min = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let avg = distances.iter().sum::<f64>() / distances.len() as f64;
    let thin_samples = distances
        .iter()
        .filter(|&&d| d < options.min_thickness_mm)
        .count();

    ThicknessReport {
        min_mm: Some(min),
        avg_mm: Some(avg),
        thin_samples,
        passes: min >= options.min_thickness_mm,
    }
}

fn invert_direction(direction: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(
        if direction.x.abs() > EPSILON {
            1.0 / direction.x
        } else {
            f64::MAX
        },
        if direction.y.abs() > EPSILON {
            1.0 / direction.y
        } else {
            f64::MAX
        },
        if direction.z.abs() > EPSILON {
            1.0 / direction.z
        } else {
            f64::MAX
        },
    )
}

// ============================================================================
// BVH acceleration
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct NodeBounds {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl NodeBounds {
    fn from_triangle(tri: &Triangle) -> Self {
        Self {
            min: Point3::new(
                tri.a.x.min(tri.b.x).min(tri.c.x),
                tri.a.y.min(tri.b.y).min(tri.c.y),
                tri.a.z.min(tri.b.z).min(tri.c.z),
            ),
            max: Point3::new(
                tri.a.x.max(tri.b.x).max(tri.c.x),
                tri.a.y.max(tri.b.y).max(tri.c.y),
                tri.a.z.max(tri.b.z).max(tri.c.z),
            ),
        }
    }

    fn merge(&mut self, other: &NodeBounds) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.min.z = self.min.z.min(other.min.z);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
        self.max.z = self.max.z.max(other.max.z);
    }

    fn expand(mut self, amount: f64) -> Self {
        self.min.x -= amount;
        self.min.y -= amount;
        self.min.z -= amount;
        self.max.x += amount;
        self.max.y += amount;
        self.max.z += amount;
        self
    }

    fn ray_intersect(&self, origin: &Point3<f64>, dir_inv: &Vector3<f64>) -> Option<f64> {
        let t1 = (self.min.x - origin.x) * dir_inv.x;
        let t2 = (self.max.x - origin.x) * dir_inv.x;
        let t3 = (self.min.y - origin.y) * dir_inv.y;
        let t4 = (self.max.y - origin.y) * dir_inv.y;
        let t5 = (self.min.z - origin.z) * dir_inv.z;
        let t6 = (self.max.z - origin.z) * dir_inv.z;

        let t_min = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let t_max = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if t_max >= t_min && t_max >= 0.0 {
            Some(t_min.max(0.0))
        } else {
            None
        }
    }
}

#[derive(Debug)]
enum BvhNode {
    Leaf {
        bounds: NodeBounds,
        face_idx: usize,
    },
    Internal {
        bounds: NodeBounds,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn build(triangles: &[Triangle], indices: &mut [usize]) -> Option<Self> {
        if indices.is_empty() {
            return None;
        }
        if indices.len() == 1 {
            let idx = indices[0];
            return Some(Self::Leaf {
                bounds: NodeBounds::from_triangle(&triangles[idx]).expand(EPSILON),
                face_idx: idx,
            });
        }

        let mut bounds = NodeBounds::from_triangle(&triangles[indices[0]]);
        for &idx in indices.iter().skip(1) {
            bounds.merge(&NodeBounds::from_triangle(&triangles[idx]));
        }
        let bounds = bounds.expand(EPSILON);

        // Split along the longest extent at the median centroid
        let extent = bounds.max - bounds.min;
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };
        indices.sort_by(|&a, &b| {
            let ca = triangles[a].centroid();
            let cb = triangles[b].centroid();
            let (va, vb) = match axis {
                0 => (ca.x, cb.x),
                1 => (ca.y, cb.y),
                _ => (ca.z, cb.z),
            };
            va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = indices.len() / 2;
        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = Self::build(triangles, left_indices);
        let right = Self::build(triangles, right_indices);

        match (left, right) {
            (Some(l), Some(r)) => Some(Self::Internal {
                bounds,
                left: Box::new(l),
                right: Box::new(r),
            }),
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        }
    }

    const fn bounds(&self) -> &NodeBounds {
        match self {
            Self::Leaf { bounds, .. } | Self::Internal { bounds, .. } => bounds,
        }
    }
}

/// Möller–Trumbore ray/triangle intersection.
fn ray_triangle_intersect(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tri: &Triangle,
) -> Option<f64> {
    let edge1 = tri.b - tri.a;
    let edge2 = tri.c - tri.a;

    let h = direction.cross(&edge2);
    let det = edge1.dot(&h);
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - tri.a;
    let u = inv_det * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = inv_det * direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * edge2.dot(&q);
    if t > MIN_HIT_DISTANCE {
        Some(t)
    } else {
        None
    }
}

fn trace_ray(
    node: &BvhNode,
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    dir_inv: &Vector3<f64>,
    triangles: &[Triangle],
    max_distance: f64,
    skip_face: usize,
) -> Option<f64> {
    match node.bounds().ray_intersect(origin, dir_inv) {
        Some(t_near) if t_near <= max_distance => {}
        _ => return None,
    }

    match node {
        BvhNode::Leaf { face_idx, .. } => {
            if *face_idx == skip_face {
                return None;
            }
            ray_triangle_intersect(origin, direction, &triangles[*face_idx])
                .filter(|&t| t <= max_distance)
        }
        BvhNode::Internal { left, right, .. } => {
            let hit_left = trace_ray(
                left,
                origin,
                direction,
                dir_inv,
                triangles,
                max_distance,
                skip_face,
            );
            let max_right = hit_left.unwrap_or(max_distance);
            let hit_right = trace_ray(
                right,
                origin,
                direction,
                dir_inv,
                triangles,
                max_right,
                skip_face,
            );
            match (hit_left, hit_right) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (Some(t), None) | (None, Some(t)) => Some(t),
                (None, None) => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{hollow_box, unit_cube};

    #[test]
    fn ray_hits_facing_triangle() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        );
        let t = ray_triangle_intersect(
            &Point3::new(0.5, 0.5, 1.0),
            &Vector3::new(0.0, 0.0, -1.0),
            &tri,
        )
        .unwrap();
        assert!((t - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ray_misses_offset_triangle() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        );
        assert!(ray_triangle_intersect(
            &Point3::new(5.0, 5.0, 1.0),
            &Vector3::new(0.0, 0.0, -1.0),
            &tri,
        )
        .is_none());
    }

    #[test]
    fn empty_mesh_yields_no_measurements() {
        let report = analyze_thickness(&TriangleMesh::new(), &ThicknessOptions::default());
        assert_eq!(report.min_mm, None);
        assert_eq!(report.avg_mm, None);
        assert!(!report.passes);
    }

    #[test]
    fn solid_cube_rays_exceed_half_scale() {
        // Every inward ray in a solid unit cube travels a full edge
        // (1.0), past half the diagonal (~0.87), so all are discarded.
        let report = analyze_thickness(&unit_cube(), &ThicknessOptions::default());
        assert_eq!(report.min_mm, None);
        assert!(!report.passes);
    }

    #[test]
    fn hollow_box_measures_its_wall() {
        let mesh = hollow_box(10.0, 1.0);
        let report = analyze_thickness(&mesh, &ThicknessOptions::default());
        let min = report.min_mm.expect("expected measurements");
        assert!((0.8..=1.3).contains(&min), "min wall {min}");
        // Wall of 1mm against a 1.2mm threshold
        assert!(!report.passes);
        assert!(report.thin_samples > 0);
    }

    #[test]
    fn thicker_wall_passes_threshold() {
        let mesh = hollow_box(20.0, 2.0);
        let report = analyze_thickness(&mesh, &ThicknessOptions::default());
        let min = report.min_mm.expect("expected measurements");
        assert!(min >= 1.2, "min wall {min}");
        assert!(report.passes);
        assert_eq!(report.thin_samples, 0);
    }

    #[test]
    fn thickness_scales_with_uniform_shrink() {
        let mesh = hollow_box(10.0, 2.0);
        let base = analyze_thickness(&mesh, &ThicknessOptions::default());

        let mut shrunk = mesh.clone();
        shrunk.apply_scale(Vector3::new(0.5, 0.5, 0.5));
        let scaled = analyze_thickness(&shrunk, &ThicknessOptions::default());

        let base_min = base.min_mm.unwrap();
        let scaled_min = scaled.min_mm.unwrap();
        let ratio = scaled_min / base_min;
        assert!((ratio - 0.5).abs() < 0.15, "ratio {ratio}");
    }
}
