//! Shared synthetic frames for tracker and session tests.

use image::{Rgb, RgbImage, Rgba, RgbaImage};

const BG: f64 = 40.0;
const AMP: f64 = 200.0;

/// Blob intensity at `(x, y)`: Gaussian with `sigma = radius / 2` on a flat
/// background. Integer shifts of `center` shift the image exactly.
fn blob_value(x: u32, y: u32, center: [f64; 2], radius: f64) -> f64 {
    let sigma = 0.5 * radius;
    let dx = x as f64 - center[0];
    let dy = y as f64 - center[1];
    (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
}

fn channels(g: f64) -> [u8; 3] {
    [
        (BG + AMP * g).round() as u8,
        (BG + 0.6 * AMP * g).round() as u8,
        (BG + 0.3 * AMP * g).round() as u8,
    ]
}

/// Render a warm-colored Gaussian blob on a dark background.
pub(crate) fn blob_frame(w: u32, h: u32, center: [f64; 2], radius: f64) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| Rgb(channels(blob_value(x, y, center, radius))))
}

/// [`blob_frame`] with an opaque alpha channel.
pub(crate) fn blob_frame_rgba(w: u32, h: u32, center: [f64; 2], radius: f64) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        let [r, g, b] = channels(blob_value(x, y, center, radius));
        Rgba([r, g, b, 255])
    })
}
