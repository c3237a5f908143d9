//! PLY (Polygon File Format) support via `ply-rs`.
//!
//! Reads ASCII and binary variants; vertex positions are required, face
//! lists optional (a vertex-only file is a point cloud). The binary
//! writer emits the header and payload by hand because ply-rs writes
//! list lengths incorrectly in binary mode.

use crate::error::{MeshError, MeshResult};
use crate::mesh::TriangleMesh;
use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Load a PLY file (ASCII or binary).
pub fn load_ply<P: AsRef<Path>>(path: P) -> MeshResult<TriangleMesh> {
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
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let header = parser
        .read_header(&mut reader)
        .map_err(|e| MeshError::invalid_content(format!("PLY header: {e}")))?;
    let payload = parser
        .read_payload(&mut reader, &header)
        .map_err(|e| MeshError::invalid_content(format!("PLY payload: {e}")))?;

    let mut mesh = TriangleMesh::new();

    if let Some(vertices) = payload.get("vertex") {
        mesh.vertices.reserve(vertices.len());
        for element in vertices {
            let x = float_property(element, "x");
            let y = float_property(element, "y");
            let z = float_property(element, "z");
            mesh.vertices.push(Point3::new(x, y, z));
        }
    }

    if let Some(faces) = payload.get("face") {
        mesh.faces.reserve(faces.len());
        for element in faces {
            let indices = index_list(element);
            if indices.len() >= 3 {
                for i in 1..indices.len() - 1 {
                    mesh.faces
                        .push([indices[0], indices[i], indices[i + 1]]);
                }
            }
        }
    }

    Ok(mesh)
}

fn float_property(element: &DefaultElement, key: &str) -> f64 {
    match element.get(key) {
        Some(Property::Float(v)) => f64::from(*v),
        Some(Property::Double(v)) => *v,
        _ => 0.0,
    }
}

fn index_list(element: &DefaultElement) -> Vec<u32> {
    for key in ["vertex_indices", "vertex_index"] {
        match element.get(key) {
            Some(Property::ListInt(v)) => return v.iter().map(|&i| i as u32).collect(),
            Some(Property::ListUInt(v)) => return v.clone(),
            Some(Property::ListUChar(v)) => return v.iter().map(|&i| u32::from(i)).collect(),
            Some(Property::ListUShort(v)) => return v.iter().map(|&i| u32::from(i)).collect(),
            Some(Property::ListShort(v)) => return v.iter().map(|&i| i as u32).collect(),
            Some(Property::ListChar(v)) => return v.iter().map(|&i| i as u32).collect(),
            _ => continue,
        }
    }
    Vec::new()
}

/// Save a mesh as PLY, binary little-endian when `binary` is set.
pub fn save_ply<P: AsRef<Path>>(mesh: &TriangleMesh, path: P, binary: bool) -> MeshResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    if binary {
        save_ply_binary(mesh, &mut writer)?;
    } else {
        save_ply_ascii(mesh, &mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

fn save_ply_binary<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> MeshResult<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "comment photoforge export")?;
    writeln!(writer, "element vertex {}", mesh.vertices.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    writeln!(writer, "element face {}", mesh.faces.len())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for v in &mesh.vertices {
        writer.write_all(&(v.x as f32).to_le_bytes())?;
        writer.write_all(&(v.y as f32).to_le_bytes())?;
        writer.write_all(&(v.z as f32).to_le_bytes())?;
    }
    for &[i0, i1, i2] in &mesh.faces {
        writer.write_all(&[3u8])?;
        writer.write_all(&(i0 as i32).to_le_bytes())?;
        writer.write_all(&(i1 as i32).to_le_bytes())?;
        writer.write_all(&(i2 as i32).to_le_bytes())?;
    }
    Ok(())
}

fn save_ply_ascii<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> MeshResult<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;
    ply.header.comments.push("photoforge export".to_string());

    let mut vertex_def = ElementDef::new("vertex".to_string());
    for axis in ["x", "y", "z"] {
        vertex_def.properties.add(PropertyDef::new(
            axis.to_string(),
            PropertyType::Scalar(ScalarType::Float),
        ));
    }
    vertex_def.count = mesh.vertices.len();
    ply.header.elements.add(vertex_def);

    let mut face_def = ElementDef::new("face".to_string());
    face_def.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(ScalarType::UChar, ScalarType::Int),
    ));
    face_def.count = mesh.faces.len();
    ply.header.elements.add(face_def);

    let mut vertex_elements = Vec::with_capacity(mesh.vertices.len());
    for v in &mesh.vertices {
        let mut element = DefaultElement::new();
        element.insert("x".to_string(), Property::Float(v.x as f32));
        element.insert("y".to_string(), Property::Float(v.y as f32));
        element.insert("z".to_string(), Property::Float(v.z as f32));
        vertex_elements.push(element);
    }
    ply.payload.insert("vertex".to_string(), vertex_elements);

    let mut face_elements = Vec::with_capacity(mesh.faces.len());
    for &[i0, i1, i2] in &mesh.faces {
        let mut element = DefaultElement::new();
        element.insert(
            "vertex_indices".to_string(),
            Property::ListInt(vec![i0 as i32, i1 as i32, i2 as i32]),
        );
        face_elements.push(element);
    }
    ply.payload.insert("face".to_string(), face_elements);

    Writer::new()
        .write_ply(writer, &mut ply)
        .map_err(|e| MeshError::invalid_content(format!("PLY write: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::unit_cube;

    #[test]
    fn binary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.ply");
        let cube = unit_cube();
        save_ply(&cube, &path, true).unwrap();
        let loaded = load_ply(&path).unwrap();
        assert_eq!(loaded.vertex_count(), cube.vertex_count());
        assert_eq!(loaded.face_count(), cube.face_count());
    }

    #[test]
    fn ascii_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube_ascii.ply");
        let cube = unit_cube();
        save_ply(&cube, &path, false).unwrap();
        let loaded = load_ply(&path).unwrap();
        assert_eq!(loaded.vertex_count(), cube.vertex_count());
        assert_eq!(loaded.face_count(), cube.face_count());
    }

    #[test]
    fn vertex_only_file_is_a_point_cloud() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.ply");
        let cloud = TriangleMesh {
            vertices: unit_cube().vertices,
            faces: Vec::new(),
            normals: None,
        };
        save_ply(&cloud, &path, false).unwrap();
        let loaded = load_ply(&path).unwrap();
        assert_eq!(loaded.vertex_count(), 8);
        assert!(loaded.faces.is_empty());
    }

    #[test]
    fn garbage_is_invalid_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.ply");
        std::fs::write(&path, "not a ply file\n").unwrap();
        assert!(matches!(
            load_ply(&path),
            Err(MeshError::InvalidContent { .. })
        ));
    }
}
