//! Wavefront OBJ support.
//!
//! The loader accepts `v`, `vn`, `f`, `o` and `g` statements, fan
//! triangulates polygons, and concatenates every object in the file into
//! one mesh. The writer emits vertex normals when the mesh carries them.

use crate::error::{MeshError, MeshResult};
use crate::mesh::TriangleMesh;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Load an OBJ file, flattening all objects into a single mesh.
pub fn load_obj<P: AsRef<Path>>(path: P) -> MeshResult<TriangleMesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MeshError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            MeshError::Io(e)
        }
    })?;
    let reader = BufReader::new(file);

    let mut mesh = TriangleMesh::new();
    let mut file_normals: Vec<Vector3<f64>> = Vec::new();
    // Normal index chosen by the faces, per vertex
    let mut vertex_normal_ids: Vec<Option<usize>> = Vec::new();
    let mut object_count = 0usize;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        match parts.next() {
            Some("o") | Some("g") => object_count += 1,
            Some("v") => {
                let (x, y, z) = parse_triplet(&mut parts)?;
                mesh.vertices.push(Point3::new(x, y, z));
                vertex_normal_ids.push(None);
            }
            Some("vn") => {
                let (x, y, z) = parse_triplet(&mut parts)?;
                file_normals.push(Vector3::new(x, y, z));
            }
            Some("f") => {
                let mut corners: Vec<(u32, Option<usize>)> = Vec::with_capacity(4);
                for token in parts {
                    let mut pieces = token.split('/');
                    let vertex: i64 = pieces
                        .next()
                        .ok_or_else(|| MeshError::invalid_content("empty face corner"))?
                        .parse()?;
                    let vertex = resolve_index(vertex, mesh.vertices.len())?;
                    // token forms: v, v/t, v//n, v/t/n
                    let _texcoord = pieces.next();
                    let normal = match pieces.next() {
                        Some(n) if !n.is_empty() => {
                            Some(resolve_index(n.parse()?, file_normals.len())? as usize)
                        }
                        _ => None,
                    };
                    corners.push((vertex, normal));
                }
                if corners.len() < 3 {
                    return Err(MeshError::invalid_content(format!(
                        "face with {} corners",
                        corners.len()
                    )));
                }
                for (vertex, normal) in &corners {
                    if let Some(n) = normal {
                        vertex_normal_ids[*vertex as usize] = Some(*n);
                    }
                }
                for i in 1..corners.len() - 1 {
                    mesh.faces
                        .push([corners[0].0, corners[i].0, corners[i + 1].0]);
                }
            }
            _ => {}
        }
    }

    if object_count > 1 {
        debug!(objects = object_count, "flattened multi-object OBJ");
    }

    // Attach normals only when every vertex resolved one
    if !file_normals.is_empty() && vertex_normal_ids.iter().all(Option::is_some) {
        mesh.normals = Some(
            vertex_normal_ids
                .iter()
                .map(|id| file_normals[id.unwrap_or_default()])
                .collect(),
        );
    }

    Ok(mesh)
}

fn parse_triplet<'a>(parts: &mut impl Iterator<Item = &'a str>) -> MeshResult<(f64, f64, f64)> {
    let mut next = || -> MeshResult<f64> {
        Ok(parts
            .next()
            .ok_or_else(|| MeshError::invalid_content("expected three coordinates"))?
            .parse()?)
    };
    Ok((next()?, next()?, next()?))
}

/// OBJ indices are 1-based; negative values count from the end.
fn resolve_index(raw: i64, len: usize) -> MeshResult<u32> {
    let resolved = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        len as i64 + raw
    } else {
        return Err(MeshError::invalid_content("OBJ index 0 is not valid"));
    };
    if resolved < 0 || resolved as usize >= len {
        return Err(MeshError::invalid_content(format!(
            "OBJ index {raw} out of range for {len} entries"
        )));
    }
    Ok(resolved as u32)
}

/// Save a mesh as OBJ, emitting `vn` records when requested and present.
pub fn save_obj<P: AsRef<Path>>(
    mesh: &TriangleMesh,
    path: P,
    include_normals: bool,
) -> MeshResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# photoforge export")?;
    writeln!(writer, "o mesh")?;
    for v in &mesh.vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }

    let normals = if include_normals {
        mesh.normals.as_deref()
    } else {
        None
    };
    if let Some(normals) = normals {
        for n in normals {
            writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
        }
        for &[i0, i1, i2] in &mesh.faces {
            writeln!(
                writer,
                "f {0}//{0} {1}//{1} {2}//{2}",
                i0 + 1,
                i1 + 1,
                i2 + 1
            )?;
        }
    } else {
        for &[i0, i1, i2] in &mesh.faces {
            writeln!(writer, "f {} {} {}", i0 + 1, i1 + 1, i2 + 1)?;
        }
    }

    writer.flush()?;
    Ok(())
}
