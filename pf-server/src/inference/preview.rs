//! Software preview rendering.
//!
//! Orthographic z-buffer rasterizer producing flat-shaded turntable
//! views. Good enough for job previews without any GPU involvement.

use image::{Rgba, RgbaImage};
use nalgebra::{Point3, Vector3};
use pf_mesh::TriangleMesh;

/// Fraction of the viewport occupied by the model.
const FIT: f64 = 0.85;

/// Flat-shading renderer with a fixed light.
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    size: u32,
}

impl PreviewRenderer {
    pub fn new(size: u32) -> Self {
        Self {
            size: size.clamp(16, 4096),
        }
    }

    /// Render the mesh viewed from the given azimuth (degrees around
    /// the vertical axis). Background pixels stay transparent.
    pub fn render(&self, mesh: &TriangleMesh, azimuth_deg: u32) -> RgbaImage {
        let size = self.size;
        let mut image = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
        if mesh.faces.is_empty() {
            return image;
        }

        let angle = f64::from(azimuth_deg).to_radians();
        let (sin, cos) = angle.sin_cos();
        let center = mesh.bounds().center();

        // Rotate around the z axis, then view along +y:
        // screen x = rotated x, screen y = -z, depth = rotated y
        let project = |p: &Point3<f64>| -> Vector3<f64> {
            let x = p.x - center.x;
            let y = p.y - center.y;
            let z = p.z - center.z;
            let rx = x * cos - y * sin;
            let ry = x * sin + y * cos;
            Vector3::new(rx, -z, ry)
        };

        let projected: Vec<Vector3<f64>> = mesh.vertices.iter().map(|v| project(v)).collect();

        let mut max_extent = 0.0f64;
        for p in &projected {
            max_extent = max_extent.max(p.x.abs()).max(p.y.abs());
        }
        if max_extent <= 0.0 {
            return image;
        }
        let scale = f64::from(size) * FIT / (2.0 * max_extent);
        let offset = f64::from(size) / 2.0;
        let to_screen =
            |p: &Vector3<f64>| -> (f64, f64) { (p.x * scale + offset, p.y * scale + offset) };

        let light = Vector3::new(-0.35, -0.8, 0.5).normalize();
        let mut depth_buffer = vec![f64::INFINITY; (size * size) as usize];

        for (face_idx, &[i0, i1, i2]) in mesh.faces.iter().enumerate() {
            let pa = projected[i0 as usize];
            let pb = projected[i1 as usize];
            let pc = projected[i2 as usize];
            let (ax, ay) = to_screen(&pa);
            let (bx, by) = to_screen(&pb);
            let (cx, cy) = to_screen(&pc);

            let area = (bx - ax) * (cy - ay) - (cx - ax) * (by - ay);
            if area.abs() < 1e-12 {
                continue;
            }

            let shade = {
                let tri = mesh.triangle(face_idx);
                let brightness = tri
                    .normal()
                    .map(|n| {
                        // Rotate the normal like the vertices
                        let rn = Vector3::new(
                            n.x * cos - n.y * sin,
                            n.x * sin + n.y * cos,
                            n.z,
                        );
                        rn.dot(&-light).abs()
                    })
                    .unwrap_or(0.0);
                (40.0 + 200.0 * brightness.clamp(0.0, 1.0)) as u8
            };

            let min_x = ax.min(bx).min(cx).floor().max(0.0) as u32;
            let max_x = (ax.max(bx).max(cx).ceil() as i64).clamp(0, i64::from(size) - 1) as u32;
            let min_y = ay.min(by).min(cy).floor().max(0.0) as u32;
            let max_y = (ay.max(by).max(cy).ceil() as i64).clamp(0, i64::from(size) - 1) as u32;

            for py in min_y..=max_y {
                for px in min_x..=max_x {
                    let fx = f64::from(px) + 0.5;
                    let fy = f64::from(py) + 0.5;
                    // Edge functions give the weight of the opposite vertex
                    let wc = ((bx - ax) * (fy - ay) - (fx - ax) * (by - ay)) / area;
                    let wa = ((cx - bx) * (fy - by) - (fx - bx) * (cy - by)) / area;
                    let wb = 1.0 - wa - wc;
                    if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                        continue;
                    }
                    let depth = wa * pa.z + wb * pb.z + wc * pc.z;
                    let idx = (py * size + px) as usize;
                    if depth < depth_buffer[idx] {
                        depth_buffer[idx] = depth;
                        image.put_pixel(px, py, Rgba([shade, shade, shade, 255]));
                    }
                }
            }
        }

        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_mesh::shapes::unit_cube;

    #[test]
    fn cube_renders_with_content() {
        let renderer = PreviewRenderer::new(64);
        let image = renderer.render(&unit_cube(), 0);
        let lit = image.pixels().filter(|p| p.0[3] > 0).count();
        assert!(lit > 0, "render produced no visible pixels");
        // Background stays transparent at the corners
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn all_azimuths_render() {
        let renderer = PreviewRenderer::new(32);
        for azimuth in [0, 90, 180, 270] {
            let image = renderer.render(&unit_cube(), azimuth);
            assert!(image.pixels().any(|p| p.0[3] > 0), "azimuth {azimuth}");
        }
    }

    #[test]
    fn empty_mesh_renders_blank() {
        let renderer = PreviewRenderer::new(32);
        let image = renderer.render(&TriangleMesh::new(), 0);
        assert!(image.pixels().all(|p| p.0[3] == 0));
    }
}
