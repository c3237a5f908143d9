//! Relief reconstruction from a single image.
//!
//! The built-in stand-in for a neural image-to-mesh model: the photo
//! becomes a printable relief plaque. Luminance (weighted by alpha)
//! drives the height of a regular grid; the grid is closed with side
//! walls and a flat base, which makes the output watertight and
//! manifold by construction.

use image::imageops::FilterType;
use image::RgbaImage;
use nalgebra::Point3;
use pf_common::{Error, Result};
use pf_mesh::TriangleMesh;
use tracing::debug;

/// Output plaque width in millimeters.
const PLAQUE_WIDTH_MM: f64 = 60.0;

/// Base slab thickness in millimeters.
const BASE_HEIGHT_MM: f64 = 3.0;

/// Maximum relief height above the base in millimeters.
const RELIEF_HEIGHT_MM: f64 = 7.0;

/// Image-to-relief reconstruction model.
#[derive(Debug, Clone)]
pub struct ReliefReconstructor {
    resolution: u32,
}

impl ReliefReconstructor {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution: resolution.clamp(8, 512),
        }
    }

    /// Map one preprocessed image to a raw triangle mesh.
    pub fn reconstruct(&self, image: &RgbaImage) -> Result<TriangleMesh> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::Internal("empty image".to_string()));
        }

        let n = self.resolution as usize;
        let grid = image::imageops::resize(image, n as u32 + 1, n as u32 + 1, FilterType::Triangle);

        let dx = PLAQUE_WIDTH_MM / n as f64;
        let aspect = f64::from(image.height()) / f64::from(image.width());
        let dy = dx * aspect;

        let stride = n + 1;
        let mut mesh = TriangleMesh::with_capacity(2 * stride * stride, 4 * n * n + 8 * n);

        // Top surface heights from luminance weighted by alpha
        for j in 0..stride {
            for i in 0..stride {
                // Image rows run top-to-bottom; the mesh's y axis runs up
                let pixel = grid.get_pixel(i as u32, (n - j) as u32).0;
                let luminance = (0.299 * f64::from(pixel[0])
                    + 0.587 * f64::from(pixel[1])
                    + 0.114 * f64::from(pixel[2]))
                    / 255.0;
                let alpha = f64::from(pixel[3]) / 255.0;
                let z = BASE_HEIGHT_MM + RELIEF_HEIGHT_MM * luminance * alpha;
                mesh.vertices
                    .push(Point3::new(i as f64 * dx, j as f64 * dy, z));
            }
        }
        // Flat base
        for j in 0..stride {
            for i in 0..stride {
                mesh.vertices
                    .push(Point3::new(i as f64 * dx, j as f64 * dy, 0.0));
            }
        }

        let top = |i: usize, j: usize| (j * stride + i) as u32;
        let bottom = |i: usize, j: usize| (stride * stride + j * stride + i) as u32;

        for j in 0..n {
            for i in 0..n {
                // Top, CCW from above
                mesh.faces.push([top(i, j), top(i + 1, j), top(i + 1, j + 1)]);
                mesh.faces.push([top(i, j), top(i + 1, j + 1), top(i, j + 1)]);
                // Base, CCW from below
                mesh.faces
                    .push([bottom(i, j), bottom(i + 1, j + 1), bottom(i + 1, j)]);
                mesh.faces
                    .push([bottom(i, j), bottom(i, j + 1), bottom(i + 1, j + 1)]);
            }
        }

        // Side walls
        for i in 0..n {
            // y = 0, outward -y
            mesh.faces.push([top(i, 0), bottom(i, 0), bottom(i + 1, 0)]);
            mesh.faces.push([top(i, 0), bottom(i + 1, 0), top(i + 1, 0)]);
            // y = max, outward +y
            mesh.faces.push([top(i, n), bottom(i + 1, n), bottom(i, n)]);
            mesh.faces.push([top(i, n), top(i + 1, n), bottom(i + 1, n)]);
        }
        for j in 0..n {
            // x = 0, outward -x
            mesh.faces.push([top(0, j), bottom(0, j + 1), bottom(0, j)]);
            mesh.faces.push([top(0, j), top(0, j + 1), bottom(0, j + 1)]);
            // x = max, outward +x
            mesh.faces.push([top(n, j), bottom(n, j), bottom(n, j + 1)]);
            mesh.faces.push([top(n, j), bottom(n, j + 1), top(n, j + 1)]);
        }

        debug!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "relief reconstruction complete"
        );
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pf_mesh::{validate, ValidateOptions};

    fn gradient_image() -> RgbaImage {
        RgbaImage::from_fn(64, 64, |x, _| {
            let v = (x * 4).min(255) as u8;
            Rgba([v, v, v, 255])
        })
    }

    #[test]
    fn reconstruction_is_watertight_and_manifold() {
        let model = ReliefReconstructor::new(16);
        let mesh = model.reconstruct(&gradient_image()).unwrap();
        let options = ValidateOptions {
            skip_thickness: true,
            ..Default::default()
        };
        let report = validate(&mesh, &options);
        assert!(report.watertight);
        assert!(report.manifold);
        assert_eq!(report.degenerate_faces, 0);
    }

    #[test]
    fn plaque_dimensions_are_plausible() {
        let model = ReliefReconstructor::new(16);
        let mesh = model.reconstruct(&gradient_image()).unwrap();
        let extent = mesh.bounds().extent();
        assert!((extent.x - PLAQUE_WIDTH_MM).abs() < 1e-9);
        assert!((extent.y - PLAQUE_WIDTH_MM).abs() < 1e-9); // square input
        assert!(extent.z >= BASE_HEIGHT_MM);
        assert!(extent.z <= BASE_HEIGHT_MM + RELIEF_HEIGHT_MM + 1e-9);
    }

    #[test]
    fn brighter_pixels_rise_higher() {
        let model = ReliefReconstructor::new(16);
        let mesh = model.reconstruct(&gradient_image()).unwrap();
        // Left edge is dark, right edge bright
        let left_max = mesh
            .vertices
            .iter()
            .filter(|v| v.x < 1.0 && v.z > 0.0)
            .map(|v| v.z)
            .fold(0.0f64, f64::max);
        let right_max = mesh
            .vertices
            .iter()
            .filter(|v| v.x > PLAQUE_WIDTH_MM - 1.0)
            .map(|v| v.z)
            .fold(0.0f64, f64::max);
        assert!(right_max > left_max);
    }

    #[test]
    fn volume_is_positive() {
        let model = ReliefReconstructor::new(12);
        let mesh = model.reconstruct(&gradient_image()).unwrap();
        assert!(mesh.signed_volume() > 0.0);
    }
}
