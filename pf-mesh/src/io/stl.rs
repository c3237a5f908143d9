//! STL (stereolithography) support, binary and ASCII.
//!
//! Binary layout:
//!
//! ```text
//! UINT8[80]    – header (ignored)
//! UINT32       – triangle count
//! per triangle
//!     REAL32[3] – normal
//!     REAL32[3] – vertex 1..3
//!     UINT16    – attribute byte count (0)
//! ```

use crate::error::{MeshError, MeshResult};
use crate::mesh::TriangleMesh;
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

/// Load an STL file, auto-detecting ASCII vs binary.
pub fn load_stl<P: AsRef<Path>>(path: P) -> MeshResult<TriangleMesh> {
    let path = path.as_ref();
    let file = open(path)?;
    let mut reader = BufReader::new(file);

    let mut header = [0u8; HEADER_SIZE + 4];
    let bytes_read = reader.read(&mut header)?;
    if bytes_read < 6 {
        return Err(MeshError::invalid_content("file too small to be valid STL"));
    }

    let header_str = String::from_utf8_lossy(&header[..bytes_read.min(HEADER_SIZE)]);
    let is_ascii = header_str.trim_start().starts_with("solid")
        && !header[..bytes_read.min(HEADER_SIZE)].contains(&0);

    if is_ascii {
        drop(reader);
        let reader = BufReader::new(open(path)?);
        load_stl_ascii(reader)
    } else {
        load_stl_binary(&header[..bytes_read], reader)
    }
}

fn open(path: &Path) -> MeshResult<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MeshError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            MeshError::Io(e)
        }
    })
}

fn load_stl_binary<R: Read>(header: &[u8], mut reader: R) -> MeshResult<TriangleMesh> {
    if header.len() < HEADER_SIZE + 4 {
        return Err(MeshError::invalid_content("truncated binary STL header"));
    }
    let face_count = u32::from_le_bytes([
        header[HEADER_SIZE],
        header[HEADER_SIZE + 1],
        header[HEADER_SIZE + 2],
        header[HEADER_SIZE + 3],
    ]);

    let mut mesh = TriangleMesh::with_capacity(face_count as usize * 3, face_count as usize);
    let mut buf = [0u8; TRIANGLE_SIZE];
    for i in 0..face_count {
        let read = reader.read(&mut buf)?;
        if read < TRIANGLE_SIZE {
            return Err(MeshError::invalid_content(format!(
                "binary STL promises {face_count} triangles but ends after {i}"
            )));
        }
        // Skip the stored normal; it is recomputed on demand
        let base = mesh.vertices.len() as u32;
        mesh.vertices.push(read_point(&buf[12..24]));
        mesh.vertices.push(read_point(&buf[24..36]));
        mesh.vertices.push(read_point(&buf[36..48]));
        mesh.faces.push([base, base + 1, base + 2]);
    }
    Ok(mesh)
}

fn read_point(buf: &[u8]) -> Point3<f64> {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Point3::new(f64::from(x), f64::from(y), f64::from(z))
}

fn load_stl_ascii<R: BufRead>(reader: R) -> MeshResult<TriangleMesh> {
    let mut mesh = TriangleMesh::new();
    let mut face_vertices: Vec<Point3<f64>> = Vec::with_capacity(3);
    let mut in_loop = false;

    for line in reader.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        match keyword {
            "outer" => {
                in_loop = true;
                face_vertices.clear();
            }
            "vertex" if in_loop => {
                let x: f64 = parts
                    .next()
                    .ok_or_else(|| MeshError::invalid_content("vertex missing coordinates"))?
                    .parse()?;
                let y: f64 = parts
                    .next()
                    .ok_or_else(|| MeshError::invalid_content("vertex missing coordinates"))?
                    .parse()?;
                let z: f64 = parts
                    .next()
                    .ok_or_else(|| MeshError::invalid_content("vertex missing coordinates"))?
                    .parse()?;
                face_vertices.push(Point3::new(x, y, z));
            }
            "endloop" => in_loop = false,
            "endfacet" => {
                if face_vertices.len() == 3 {
                    let base = mesh.vertices.len() as u32;
                    mesh.vertices.append(&mut face_vertices);
                    mesh.faces.push([base, base + 1, base + 2]);
                }
                face_vertices.clear();
            }
            "endsolid" => break,
            _ => {}
        }
    }
    Ok(mesh)
}

/// Save a mesh as STL, binary when `binary` is set.
pub fn save_stl<P: AsRef<Path>>(mesh: &TriangleMesh, path: P, binary: bool) -> MeshResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    if binary {
        save_stl_binary(mesh, &mut writer)?;
    } else {
        save_stl_ascii(mesh, &mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

fn save_stl_binary<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> MeshResult<()> {
    let mut header = [b' '; HEADER_SIZE];
    let text = b"Binary STL generated by photoforge";
    header[..text.len()].copy_from_slice(text);
    writer.write_all(&header)?;
    writer.write_all(&(mesh.faces.len() as u32).to_le_bytes())?;

    for idx in 0..mesh.faces.len() {
        let tri = mesh.triangle(idx);
        let normal = tri.normal().unwrap_or_else(nalgebra::Vector3::zeros);
        for value in [normal.x, normal.y, normal.z] {
            writer.write_all(&(value as f32).to_le_bytes())?;
        }
        for point in [tri.a, tri.b, tri.c] {
            for value in [point.x, point.y, point.z] {
                writer.write_all(&(value as f32).to_le_bytes())?;
            }
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

fn save_stl_ascii<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> MeshResult<()> {
    writeln!(writer, "solid mesh")?;
    for idx in 0..mesh.faces.len() {
        let tri = mesh.triangle(idx);
        let n = tri.normal().unwrap_or_else(nalgebra::Vector3::zeros);
        writeln!(writer, "  facet normal {:.6e} {:.6e} {:.6e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for p in [tri.a, tri.b, tri.c] {
            writeln!(writer, "      vertex {:.6e} {:.6e} {:.6e}", p.x, p.y, p.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid mesh")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::unit_cube;

    #[test]
    fn binary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.stl");
        let cube = unit_cube();
        save_stl(&cube, &path, true).unwrap();
        let loaded = load_stl(&path).unwrap();
        assert_eq!(loaded.face_count(), 12);
        assert_eq!(loaded.vertex_count(), 36); // triangle soup
    }

    #[test]
    fn ascii_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube_ascii.stl");
        let cube = unit_cube();
        save_stl(&cube, &path, false).unwrap();
        let loaded = load_stl(&path).unwrap();
        assert_eq!(loaded.face_count(), cube.face_count());
        // ASCII f32 precision keeps unit coordinates exact
        assert!((loaded.vertices[0].x - cube.vertices[0].x).abs() < 1e-5);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_stl("does_not_exist.stl").unwrap_err();
        assert!(matches!(err, MeshError::FileNotFound { .. }));
    }

    #[test]
    fn ascii_parsing_from_text() {
        let text = "solid test\n  facet normal 0 0 1\n    outer loop\n      vertex 0 0 0\n      vertex 1 0 0\n      vertex 0 1 0\n    endloop\n  endfacet\nendsolid test\n";
        let mesh = load_stl_ascii(BufReader::new(text.as_bytes())).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn truncated_binary_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.stl");
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes.extend_from_slice(&10u32.to_le_bytes()); // promises 10 faces
        std::fs::write(&path, bytes).unwrap();
        let err = load_stl(&path).unwrap_err();
        assert!(matches!(err, MeshError::InvalidContent { .. }));
    }
}
