//! Background removal by border-sampled chroma matting.
//!
//! Stands in for a neural matting model: the background color is
//! estimated from the image border and every pixel's alpha follows its
//! chroma distance from that estimate. Images that already carry
//! transparency are passed through untouched.

use image::RgbaImage;
use tracing::debug;

/// Alpha below this marks a pixel as already transparent.
const OPAQUE_THRESHOLD: u8 = 250;

/// Chroma distance at which a pixel starts becoming foreground.
const NEAR_DISTANCE: f64 = 30.0;

/// Chroma distance at which a pixel is fully foreground.
const FAR_DISTANCE: f64 = 90.0;

/// Border-sampling chroma matte.
#[derive(Debug, Clone, Default)]
pub struct ChromaMatte;

impl ChromaMatte {
    /// Produce an RGBA cut-out of the subject.
    pub fn remove_background(&self, image: &RgbaImage) -> RgbaImage {
        if image
            .pixels()
            .any(|p| p.0[3] < OPAQUE_THRESHOLD)
        {
            debug!("image already carries transparency, keeping it");
            return image.clone();
        }

        let background = border_mean(image);
        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            let [r, g, b, _] = pixel.0;
            let distance = ((f64::from(r) - background[0]).powi(2)
                + (f64::from(g) - background[1]).powi(2)
                + (f64::from(b) - background[2]).powi(2))
            .sqrt();
            let alpha = ((distance - NEAR_DISTANCE) / (FAR_DISTANCE - NEAR_DISTANCE))
                .clamp(0.0, 1.0);
            pixel.0[3] = (alpha * 255.0).round() as u8;
        }
        out
    }
}

/// Mean color of the one-pixel image border.
fn border_mean(image: &RgbaImage) -> [f64; 3] {
    let (width, height) = image.dimensions();
    let mut sum = [0.0f64; 3];
    let mut count = 0u64;
    for x in 0..width {
        for y in [0, height.saturating_sub(1)] {
            let p = image.get_pixel(x, y).0;
            sum[0] += f64::from(p[0]);
            sum[1] += f64::from(p[1]);
            sum[2] += f64::from(p[2]);
            count += 1;
        }
    }
    for y in 1..height.saturating_sub(1) {
        for x in [0, width.saturating_sub(1)] {
            let p = image.get_pixel(x, y).0;
            sum[0] += f64::from(p[0]);
            sum[1] += f64::from(p[1]);
            sum[2] += f64::from(p[2]);
            count += 1;
        }
    }
    let count = count.max(1) as f64;
    [sum[0] / count, sum[1] / count, sum[2] / count]
}
