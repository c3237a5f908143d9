//! Mesh repair pipeline for FDM printing.
//!
//! Fixed order: merge close vertices, remove degenerate faces, remove
//! duplicate faces, fix winding, fill holes. Each step is a fallible
//! function; a failing step leaves its input untouched and the pipeline
//! continues with the best mesh so far. The repairer never guarantees
//! watertightness; callers re-run the validator afterwards.

use crate::adjacency::EdgeAdjacency;
use crate::error::{MeshError, MeshResult};
use crate::mesh::TriangleMesh;
use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Parameters for the repair pipeline.
#[derive(Debug, Clone)]
pub struct RepairOptions {
    /// Distance below which vertices are merged into one.
    pub merge_tolerance: f64,
    /// Area below which a face counts as degenerate.
    pub degenerate_area_threshold: f64,
    /// Boundary loops longer than this are left open.
    pub max_hole_edges: usize,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            merge_tolerance: 1e-8,
            degenerate_area_threshold: 1e-10,
            max_hole_edges: 512,
        }
    }
}

/// Counts of what each repair step changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub vertices_merged: usize,
    pub degenerate_faces_removed: usize,
    pub duplicate_faces_removed: usize,
    pub faces_reoriented: usize,
    pub holes_filled: usize,
    pub unreferenced_vertices_removed: usize,
}

impl RepairSummary {
    pub fn changed_anything(&self) -> bool {
        *self != Self::default()
    }
}

/// Run the full repair pipeline, returning a new mesh.
///
/// Idempotent on a clean mesh: repairing a watertight, manifold,
/// degenerate-free mesh returns an equal mesh and an all-zero summary.
pub fn repair(mesh: &TriangleMesh, options: &RepairOptions) -> (TriangleMesh, RepairSummary) {
    let mut out = mesh.clone();
    let mut summary = RepairSummary::default();

    summary.vertices_merged = merge_close_vertices(&mut out, options.merge_tolerance);
    summary.degenerate_faces_removed =
        remove_degenerate_faces(&mut out, options.degenerate_area_threshold);
    summary.duplicate_faces_removed = remove_duplicate_faces(&mut out);
    summary.faces_reoriented = fix_normals(&mut out);

    let adjacency = EdgeAdjacency::build(&out.faces);
    if !adjacency.every_edge_has_two_faces() {
        match fill_holes(&mut out, options.max_hole_edges) {
            Ok(filled) => summary.holes_filled = filled,
            Err(e) => {
                // Keep the best mesh obtained by the prior steps
                warn!(error = %e, "hole filling failed, returning unfilled mesh");
            }
        }
    }

    summary.unreferenced_vertices_removed = remove_unreferenced_vertices(&mut out);

    debug!(
        merged = summary.vertices_merged,
        degenerate = summary.degenerate_faces_removed,
        duplicates = summary.duplicate_faces_removed,
        reoriented = summary.faces_reoriented,
        holes = summary.holes_filled,
        "mesh repair complete"
    );

    (out, summary)
}

/// Collapse vertices within `tolerance` of each other, remapping faces.
///
/// Uses a spatial hash so welding stays near-linear. Attached per-vertex
/// normals are averaged onto the surviving vertex. Faces collapsed to a
/// line or point by the merge are dropped. Returns the number of
/// vertices merged away.
pub fn merge_close_vertices(mesh: &mut TriangleMesh, tolerance: f64) -> usize {
    let vertex_count = mesh.vertices.len();
    if vertex_count == 0 || tolerance <= 0.0 {
        return 0;
    }

    let cell_size = tolerance * 2.0;
    let mut spatial_hash: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, pos) in mesh.vertices.iter().enumerate() {
        spatial_hash
            .entry(pos_to_cell(pos, cell_size))
            .or_default()
            .push(idx as u32);
    }

    let mut remap: Vec<u32> = (0..vertex_count as u32).collect();
    let mut merged = 0;

    for (idx, pos) in mesh.vertices.iter().enumerate() {
        let idx = idx as u32;
        if remap[idx as usize] != idx {
            continue;
        }
        let cell = pos_to_cell(pos, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbor = (cell.0 + dx, cell.1 + dy, cell.2 + dz);
                    let Some(candidates) = spatial_hash.get(&neighbor) else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || remap[other as usize] != other {
                            continue;
                        }
                        if (pos - mesh.vertices[other as usize]).norm() < tolerance {
                            remap[other as usize] = idx;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged == 0 {
        return 0;
    }

    // Resolve transitive merges
    for i in 0..remap.len() {
        let mut target = remap[i];
        while remap[target as usize] != target {
            target = remap[target as usize];
        }
        remap[i] = target;
    }

    // Average normals onto surviving vertices
    if let Some(normals) = &mut mesh.normals {
        let mut sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); vertex_count];
        for (i, n) in normals.iter().enumerate() {
            sums[remap[i] as usize] += *n;
        }
        for (i, n) in normals.iter_mut().enumerate() {
            if remap[i] as usize == i {
                let len = sums[i].norm();
                if len > f64::EPSILON {
                    *n = sums[i] / len;
                }
            }
        }
    }

    for face in &mut mesh.faces {
        face[0] = remap[face[0] as usize];
        face[1] = remap[face[1] as usize];
        face[2] = remap[face[2] as usize];
    }
    mesh.faces
        .retain(|&[i0, i1, i2]| i0 != i1 && i1 != i2 && i0 != i2);

    merged
}

/// Drop faces with area below the threshold. Returns the removal count.
pub fn remove_degenerate_faces(mesh: &mut TriangleMesh, area_threshold: f64) -> usize {
    let before = mesh.faces.len();
    let vertices = std::mem::take(&mut mesh.vertices);
    mesh.faces.retain(|&[i0, i1, i2]| {
        let a = &vertices[i0 as usize];
        let b = &vertices[i1 as usize];
        let c = &vertices[i2 as usize];
        let area = (b - a).cross(&(c - a)).norm() * 0.5;
        area >= area_threshold
    });
    mesh.vertices = vertices;
    before - mesh.faces.len()
}

/// Drop faces whose vertex triples are equal under any rotation.
///
/// Triples are sorted before comparison, so reversed-winding copies are
/// duplicates too. The first occurrence is kept.
pub fn remove_duplicate_faces(mesh: &mut TriangleMesh) -> usize {
    let before = mesh.faces.len();
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(before);
    mesh.faces.retain(|&face| {
        let mut key = face;
        key.sort_unstable();
        seen.insert(key)
    });
    before - mesh.faces.len()
}

/// Reorient faces so winding is consistent and normals point outward.
///
/// Propagates orientation across manifold edges breadth-first, then
/// flips the whole mesh if the resulting signed volume is negative.
/// Per-vertex normals are recomputed when the mesh carries them.
/// Returns the number of face flips performed.
pub fn fix_normals(mesh: &mut TriangleMesh) -> usize {
    let face_count = mesh.faces.len();
    if face_count == 0 {
        return 0;
    }

    let adjacency = EdgeAdjacency::build(&mesh.faces);
    let mut visited = vec![false; face_count];
    let mut flips = 0;

    for start in 0..face_count {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut queue = VecDeque::from([start]);

        while let Some(face_idx) = queue.pop_front() {
            let face = mesh.faces[face_idx];
            let directed_edges = [
                (face[0], face[1]),
                (face[1], face[2]),
                (face[2], face[0]),
            ];
            for (a, b) in directed_edges {
                let Some(incident) = adjacency.faces_for_edge(a, b) else {
                    continue;
                };
                // Orientation only propagates across manifold edges
                if incident.len() != 2 {
                    continue;
                }
                for &neighbor in incident {
                    if neighbor == face_idx || visited[neighbor] {
                        continue;
                    }
                    // Consistent winding means the shared edge runs in
                    // opposite directions in the two faces
                    if has_directed_edge(&mesh.faces[neighbor], a, b) {
                        mesh.faces[neighbor].swap(1, 2);
                        flips += 1;
                    }
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
    }

    if mesh.signed_volume() < 0.0 {
        for face in &mut mesh.faces {
            face.swap(1, 2);
        }
        flips += face_count;
    }

    if mesh.normals.is_some() {
        mesh.normals = Some(compute_vertex_normals(mesh));
    }

    flips
}

/// Triangulate boundary loops to close the surface.
///
/// Only loops with at most `max_hole_edges` edges are filled; the mesh
/// is untouched when any fillable loop cannot be triangulated.
/// Returns the number of holes closed.
pub fn fill_holes(mesh: &mut TriangleMesh, max_hole_edges: usize) -> MeshResult<usize> {
    let loops = trace_boundary_loops(&mesh.faces);
    if loops.is_empty() {
        return Ok(0);
    }

    let mut new_faces = Vec::new();
    let mut filled = 0;
    for boundary in &loops {
        if boundary.len() > max_hole_edges {
            warn!(
                edges = boundary.len(),
                max = max_hole_edges,
                "skipping oversized boundary loop"
            );
            continue;
        }
        let triangles = triangulate_loop(mesh, boundary);
        if triangles.is_empty() {
            return Err(MeshError::HoleFillFailed {
                reason: format!("could not triangulate loop of {} edges", boundary.len()),
            });
        }
        new_faces.extend(triangles);
        filled += 1;
    }

    mesh.faces.extend(new_faces);
    Ok(filled)
}

/// Drop vertices no face references and compact the vertex array.
pub fn remove_unreferenced_vertices(mesh: &mut TriangleMesh) -> usize {
    let before = mesh.vertices.len();
    let mut referenced = vec![false; before];
    for face in &mesh.faces {
        for &i in face {
            referenced[i as usize] = true;
        }
    }
    if referenced.iter().all(|&r| r) {
        return 0;
    }

    let mut remap = vec![u32::MAX; before];
    let mut new_vertices = Vec::new();
    let mut new_normals = mesh.normals.as_ref().map(|_| Vec::new());
    for (old_idx, keep) in referenced.iter().enumerate() {
        if *keep {
            remap[old_idx] = new_vertices.len() as u32;
            new_vertices.push(mesh.vertices[old_idx]);
            if let (Some(out), Some(normals)) = (&mut new_normals, &mesh.normals) {
                out.push(normals[old_idx]);
            }
        }
    }
    for face in &mut mesh.faces {
        face[0] = remap[face[0] as usize];
        face[1] = remap[face[1] as usize];
        face[2] = remap[face[2] as usize];
    }
    mesh.vertices = new_vertices;
    mesh.normals = new_normals;
    before - mesh.vertices.len()
}

/// Area-weighted per-vertex normals from face geometry.
pub fn compute_vertex_normals(mesh: &TriangleMesh) -> Vec<Vector3<f64>> {
    let mut normals = vec![Vector3::zeros(); mesh.vertices.len()];
    for (idx, face) in mesh.faces.iter().enumerate() {
        let tri = mesh.triangle(idx);
        if let Some(n) = tri.normal() {
            let weighted = n * tri.area();
            for &vi in face {
                normals[vi as usize] += weighted;
            }
        }
    }
    for n in &mut normals {
        let len = n.norm();
        if len > f64::EPSILON {
            *n /= len;
        }
    }
    normals
}

#[inline]
fn pos_to_cell(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

fn has_directed_edge(face: &[u32; 3], a: u32, b: u32) -> bool {
    (face[0] == a && face[1] == b)
        || (face[1] == a && face[2] == b)
        || (face[2] == a && face[0] == b)
}

/// Trace boundary edges into closed vertex loops.
///
/// Boundary edges keep the direction they have in their single incident
/// face, so each traced loop runs the way the surrounding surface winds
/// around the hole. [`triangulate_loop`] reverses the loop, which makes
/// the fill triangles wind consistently with their neighbors.
fn trace_boundary_loops(faces: &[[u32; 3]]) -> Vec<Vec<u32>> {
    let mut undirected_counts: HashMap<(u32, u32), usize> = HashMap::new();
    for face in faces {
        for (a, b) in face_edges(face) {
            let key = if a < b { (a, b) } else { (b, a) };
            *undirected_counts.entry(key).or_default() += 1;
        }
    }

    // Directed boundary edges, keyed by their start vertex
    let mut successors: HashMap<u32, Vec<u32>> = HashMap::new();
    let mut boundary_count = 0;
    for face in faces {
        for (a, b) in face_edges(face) {
            let key = if a < b { (a, b) } else { (b, a) };
            if undirected_counts[&key] == 1 {
                successors.entry(a).or_default().push(b);
                boundary_count += 1;
            }
        }
    }
    if boundary_count == 0 {
        return Vec::new();
    }

    let mut visited: HashSet<(u32, u32)> = HashSet::new();
    let mut loops = Vec::new();

    let starts: Vec<u32> = successors.keys().copied().collect();
    for start in starts {
        let Some(&first) = successors.get(&start).and_then(|v| v.first()) else {
            continue;
        };
        if visited.contains(&(start, first)) {
            continue;
        }

        let mut loop_vertices = vec![start];
        let mut current = start;
        loop {
            let next = successors
                .get(&current)
                .and_then(|cands| cands.iter().find(|&&n| !visited.contains(&(current, n))))
                .copied();
            match next {
                Some(n) => {
                    visited.insert((current, n));
                    if n == start {
                        break;
                    }
                    loop_vertices.push(n);
                    current = n;
                }
                None => {
                    warn!(start, "boundary loop is not closed");
                    loop_vertices.clear();
                    break;
                }
            }
        }

        if loop_vertices.len() >= 3 {
            loops.push(loop_vertices);
        }
    }

    loops
}

#[inline]
fn face_edges(face: &[u32; 3]) -> [(u32, u32); 3] {
    [
        (face[0], face[1]),
        (face[1], face[2]),
        (face[2], face[0]),
    ]
}

/// Ear-clip a boundary loop into triangles, with a fan fallback.
///
/// The loop arrives in surface winding order and is reversed here, so
/// emitted triangles share each boundary edge in the opposite direction
/// to the existing face on that edge.
fn triangulate_loop(mesh: &TriangleMesh, directed_loop: &[u32]) -> Vec<[u32; 3]> {
    let n = directed_loop.len();
    if n < 3 {
        return Vec::new();
    }
    let boundary: Vec<u32> = directed_loop.iter().rev().copied().collect();

    let positions: Vec<Point3<f64>> = boundary
        .iter()
        .map(|&i| mesh.vertices[i as usize])
        .collect();

    let centroid = positions
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords)
        / n as f64;
    let centroid = Point3::from(centroid);
    let loop_normal = loop_normal(&positions, &centroid);

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::new();

    while remaining.len() > 3 {
        let mut clipped = false;
        for i in 0..remaining.len() {
            let prev = remaining[(i + remaining.len() - 1) % remaining.len()];
            let curr = remaining[i];
            let next = remaining[(i + 1) % remaining.len()];
            if is_ear(&positions, &remaining, prev, curr, next, &loop_normal) {
                triangles.push([boundary[prev], boundary[curr], boundary[next]]);
                remaining.remove(i);
                clipped = true;
                break;
            }
        }
        if !clipped {
            debug!(
                remaining = remaining.len(),
                "ear clipping stalled, falling back to fan triangulation"
            );
            break;
        }
    }

    if remaining.len() == 3 {
        triangles.push([
            boundary[remaining[0]],
            boundary[remaining[1]],
            boundary[remaining[2]],
        ]);
    } else {
        let center = remaining[0];
        for i in 1..remaining.len() - 1 {
            triangles.push([
                boundary[center],
                boundary[remaining[i]],
                boundary[remaining[i + 1]],
            ]);
        }
    }

    triangles
}

fn loop_normal(positions: &[Point3<f64>], centroid: &Point3<f64>) -> Vector3<f64> {
    let n = positions.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let v0 = positions[i] - centroid;
        let v1 = positions[(i + 1) % n] - centroid;
        normal += v0.cross(&v1);
    }
    let len = normal.norm();
    if len > f64::EPSILON {
        normal / len
    } else {
        Vector3::z()
    }
}

fn is_ear(
    positions: &[Point3<f64>],
    remaining: &[usize],
    prev: usize,
    curr: usize,
    next: usize,
    loop_normal: &Vector3<f64>,
) -> bool {
    let a = positions[prev];
    let b = positions[curr];
    let c = positions[next];

    let cross = (b - a).cross(&(c - a));
    if cross.norm() < f64::EPSILON {
        return false;
    }
    if cross.dot(loop_normal) < 0.0 {
        return false; // reflex corner
    }

    for &idx in remaining {
        if idx == prev || idx == curr || idx == next {
            continue;
        }
        if point_in_triangle(&positions[idx], &a, &b, &c, loop_normal) {
            return false;
        }
    }
    true
}

fn point_in_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    normal: &Vector3<f64>,
) -> bool {
    // Project onto the dominant plane of the loop normal
    let abs = Vector3::new(normal.x.abs(), normal.y.abs(), normal.z.abs());
    let to_2d = |v: &Point3<f64>| -> (f64, f64) {
        if abs.z >= abs.x && abs.z >= abs.y {
            (v.x, v.y)
        } else if abs.y >= abs.x {
            (v.x, v.z)
        } else {
            (v.y, v.z)
        }
    };
    let (px, py) = to_2d(p);
    let (ax, ay) = to_2d(a);
    let (bx, by) = to_2d(b);
    let (cx, cy) = to_2d(c);

    let sign =
        |x1: f64, y1: f64, x2: f64, y2: f64| (px - x2) * (y1 - y2) - (x1 - x2) * (py - y2);
    let d1 = sign(ax, ay, bx, by);
    let d2 = sign(bx, by, cx, cy);
    let d3 = sign(cx, cy, ax, ay);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{open_box, unit_cube};
    use crate::validate::{validate, ValidateOptions};

    #[test]
    fn merge_welds_near_duplicates() {
        let mut mesh = TriangleMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(0.0, 10.0, 0.0),
                Point3::new(10.0 + 1e-9, 0.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 3, 2]],
        );
        let merged = merge_close_vertices(&mut mesh, 1e-8);
        assert_eq!(merged, 1);
        // The second face now references the surviving vertex
        assert_eq!(mesh.faces[1], [0, 1, 2]);
    }

    #[test]
    fn merge_drops_collapsed_faces() {
        let mut mesh = TriangleMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1e-10, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        merge_close_vertices(&mut mesh, 1e-8);
        assert!(mesh.faces.is_empty());
    }

    #[test]
    fn degenerate_faces_removed_then_count_is_zero() {
        let mut mesh = TriangleMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 1, 3]],
        );
        let removed = remove_degenerate_faces(&mut mesh, 1e-10);
        assert_eq!(removed, 1);
        assert_eq!(mesh.faces.len(), 1);
        assert_eq!(remove_degenerate_faces(&mut mesh, 1e-10), 0);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let mut mesh = unit_cube();
        let face = mesh.faces[0];
        mesh.faces.push(face);
        let removed = remove_duplicate_faces(&mut mesh);
        assert_eq!(removed, 1);
        assert_eq!(mesh.faces.len(), 12);
    }

    #[test]
    fn rotated_and_reversed_triples_are_duplicates() {
        let mut mesh = TriangleMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [1, 2, 0], [0, 2, 1]],
        );
        let removed = remove_duplicate_faces(&mut mesh);
        assert_eq!(removed, 2);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn fix_normals_restores_outward_winding() {
        let mut mesh = unit_cube();
        // Flip a handful of faces
        mesh.faces[3].swap(1, 2);
        mesh.faces[7].swap(1, 2);
        let flips = fix_normals(&mut mesh);
        assert!(flips > 0);
        assert!((mesh.signed_volume() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fix_normals_flips_inside_out_mesh() {
        let mut mesh = unit_cube();
        for face in &mut mesh.faces {
            face.swap(1, 2);
        }
        assert!(mesh.signed_volume() < 0.0);
        fix_normals(&mut mesh);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn open_box_closes_after_fill() {
        let mut mesh = open_box();
        let filled = fill_holes(&mut mesh, 64).unwrap();
        assert_eq!(filled, 1);
        let adjacency = EdgeAdjacency::build(&mesh.faces);
        assert!(adjacency.every_edge_has_two_faces());
    }

    #[test]
    fn oversized_holes_are_left_open() {
        let mut mesh = open_box();
        let faces_before = mesh.faces.len();
        let filled = fill_holes(&mut mesh, 3).unwrap();
        assert_eq!(filled, 0);
        assert_eq!(mesh.faces.len(), faces_before);
    }

    #[test]
    fn unreferenced_vertices_are_compacted() {
        let mut mesh = unit_cube();
        mesh.vertices.push(Point3::new(99.0, 99.0, 99.0));
        let removed = remove_unreferenced_vertices(&mut mesh);
        assert_eq!(removed, 1);
        assert_eq!(mesh.vertex_count(), 8);
        assert!(mesh.check().is_ok());
    }

    #[test]
    fn repair_is_idempotent_on_clean_mesh() {
        let cube = unit_cube();
        let (repaired, summary) = repair(&cube, &RepairOptions::default());
        assert!(!summary.changed_anything());
        assert_eq!(repaired.vertex_count(), cube.vertex_count());
        assert_eq!(repaired.face_count(), cube.face_count());
    }

    #[test]
    fn double_repair_matches_single_repair_report() {
        let mesh = open_box();
        let options = RepairOptions::default();
        let (once, _) = repair(&mesh, &options);
        let (twice, second_summary) = repair(&once, &options);

        let validate_options = ValidateOptions::default();
        let report_once = validate(&once, &validate_options);
        let report_twice = validate(&twice, &validate_options);
        assert_eq!(report_once.watertight, report_twice.watertight);
        assert_eq!(report_once.manifold, report_twice.manifold);
        assert_eq!(report_once.degenerate_faces, report_twice.degenerate_faces);
        assert!(!second_summary.changed_anything());
    }

    #[test]
    fn repair_does_not_mutate_input() {
        let mesh = open_box();
        let face_count = mesh.face_count();
        let _ = repair(&mesh, &RepairOptions::default());
        assert_eq!(mesh.face_count(), face_count);
    }

    #[test]
    fn vertex_normals_follow_repair() {
        let mut mesh = unit_cube();
        mesh.normals = Some(compute_vertex_normals(&mesh));
        let (repaired, _) = repair(&mesh, &RepairOptions::default());
        let normals = repaired.normals.as_ref().expect("normals preserved");
        assert_eq!(normals.len(), repaired.vertex_count());
        for n in normals {
            assert!((n.norm() - 1.0).abs() < 1e-9);
        }
    }
}
