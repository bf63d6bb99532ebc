//! Grayscale extraction from 8-bit color frames.

use image::{GenericImageView, Pixel};

const INV_255: f32 = 1.0 / 255.0;

/// Rec. 601 luma of an 8-bit pixel, normalized to [0, 1].
///
/// Alpha is ignored; single-channel pixels pass through unchanged since the
/// weights sum to one.
#[inline]
pub(crate) fn luma_u8<P: Pixel<Subpixel = u8>>(px: &P) -> f32 {
    let [r, g, b] = px.to_rgb().0;
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) * INV_255
}

/// Row-major grayscale raster with intensities in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct GrayPatch {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl GrayPatch {
    /// Copy the `w × h` block at `(x, y)` out of `frame`.
    ///
    /// The block must lie inside the frame.
    pub(crate) fn from_view<I>(frame: &I, x: u32, y: u32, w: u32, h: u32) -> Self
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        debug_assert!(x + w <= frame.width() && y + h <= frame.height());
        let mut data = Vec::with_capacity(w as usize * h as usize);
        for yy in y..y + h {
            for xx in x..x + w {
                data.push(luma_u8(&frame.get_pixel(xx, yy)));
            }
        }
        Self {
            width: w as usize,
            height: h as usize,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub(crate) fn row(&self, y: usize, x: usize, len: usize) -> &[f32] {
        let start = y * self.width + x;
        &self.data[start..start + len]
    }
}
