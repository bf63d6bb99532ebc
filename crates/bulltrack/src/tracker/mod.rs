//! Single-target template tracker.
//!
//! The user picks a rectangle once; every later frame is searched in a
//! square window around the current estimate for the patch with the highest
//! zero-mean normalized cross-correlation. There is no detector and no
//! lost-track state: [`TemplateTracker::update`] always reports its best
//! guess together with the score so callers can gate on confidence.

mod config;
mod luma;
mod zncc;

pub use config::TrackerConfig;
pub use luma::GrayPatch;
pub use zncc::Template;

use image::{GenericImageView, Pixel};

/// Axis-aligned pixel rectangle (top-left corner plus size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Geometric center in pixel coordinates.
    pub fn center(&self) -> [f64; 2] {
        [
            self.x as f64 + 0.5 * self.width as f64,
            self.y as f64 + 0.5 * self.height as f64,
        ]
    }

    /// `true` when the rectangle is non-empty and fully inside a
    /// `w × h` frame.
    pub fn fits_in(&self, w: u32, h: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x >= 0
            && self.y >= 0
            && self.x as i64 + self.width as i64 <= w as i64
            && self.y as i64 + self.height as i64 <= h as i64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerError {
    /// Selection rectangle is empty or leaves the frame.
    InvalidRegion { rect: PixelRect, frame_size: [u32; 2] },
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRegion { rect, frame_size } => write!(
                f,
                "invalid region: {}x{} at ({}, {}) does not fit in a {}x{} frame",
                rect.width, rect.height, rect.x, rect.y, frame_size[0], frame_size[1]
            ),
        }
    }
}

impl std::error::Error for TrackerError {}

/// Outcome of one [`TemplateTracker::update`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackResult {
    /// Winning patch, same size as the template.
    pub rect: PixelRect,
    /// ZNCC of the winning patch. Conceptually in [-1, 1]; not clamped.
    pub score: f64,
}

impl TrackResult {
    pub fn center(&self) -> [f64; 2] {
        self.rect.center()
    }
}

#[derive(Debug, Clone)]
struct TrackState {
    template: Template,
    center: [f64; 2],
}

/// Windowed ZNCC tracker for one manually selected patch.
#[derive(Debug, Clone, Default)]
pub struct TemplateTracker {
    config: TrackerConfig,
    state: Option<TrackState>,
}

impl TemplateTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Capture the template from `rect` and reset the estimate to its center.
    ///
    /// On error the tracker keeps whatever state it had before.
    pub fn initialize<I>(&mut self, frame: &I, rect: PixelRect) -> Result<(), TrackerError>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        let (w, h) = frame.dimensions();
        if !rect.fits_in(w, h) {
            return Err(TrackerError::InvalidRegion {
                rect,
                frame_size: [w, h],
            });
        }

        let patch = GrayPatch::from_view(
            frame,
            rect.x as u32,
            rect.y as u32,
            rect.width as u32,
            rect.height as u32,
        );
        let template = Template::new(patch, self.config.zncc_eps);
        tracing::info!(
            "template captured: {}x{} at ({}, {}), mean {:.3}, norm {:.3}",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            template.mean(),
            template.norm()
        );

        self.state = Some(TrackState {
            template,
            center: rect.center(),
        });
        Ok(())
    }

    /// Search the window around the current estimate and move the estimate
    /// toward the best match.
    ///
    /// Returns `None` (and changes nothing) when the tracker is not
    /// initialized or the frame leaves no room for a single candidate.
    pub fn update<I>(&mut self, frame: &I) -> Option<TrackResult>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        let state = self.state.as_mut()?;
        let (fw, fh) = frame.dimensions();
        let tw = state.template.width() as i64;
        let th = state.template.height() as i64;
        let [cx, cy] = state.center;
        let win = self.config.search_radius_px as f64;

        // Window of candidate top-left corners, clamped so the template fits.
        let x0 = ((cx - win).floor() as i64).max(0);
        let y0 = ((cy - win).floor() as i64).max(0);
        let x1 = (fw as i64 - tw).min((cx + win).floor() as i64);
        let y1 = (fh as i64 - th).min((cy + win).floor() as i64);
        if x1 < x0 || y1 < y0 {
            tracing::warn!(
                "empty search window around ({:.1}, {:.1}) in {}x{} frame",
                cx,
                cy,
                fw,
                fh
            );
            return None;
        }

        let region = GrayPatch::from_view(
            frame,
            x0 as u32,
            y0 as u32,
            (x1 - x0 + tw) as u32,
            (y1 - y0 + th) as u32,
        );
        let hit = zncc::search(
            &region,
            &state.template,
            self.config.stride_px as usize,
            self.config.zncc_eps,
        )?;

        let rect = PixelRect::new(
            (x0 + hit.x as i64) as i32,
            (y0 + hit.y as i64) as i32,
            tw as i32,
            th as i32,
        );
        let [bx, by] = rect.center();
        let a = self.config.position_blend;
        state.center = [a * bx + (1.0 - a) * cx, a * by + (1.0 - a) * cy];

        tracing::trace!(
            "match at ({}, {}) score {:.4} over {} candidates",
            rect.x,
            rect.y,
            hit.score,
            hit.n_candidates
        );
        Some(TrackResult {
            rect,
            score: hit.score,
        })
    }

    /// Current position estimate, or `None` before [`Self::initialize`].
    pub fn center(&self) -> Option<[f64; 2]> {
        self.state.as_ref().map(|s| s.center)
    }

    pub fn template(&self) -> Option<&Template> {
        self.state.as_ref().map(|s| &s.template)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{blob_frame, blob_frame_rgba};
    use approx::assert_abs_diff_eq;

    const W: u32 = 320;
    const H: u32 = 240;

    #[test]
    fn test_update_without_initialize_is_noop() {
        let frame = blob_frame(W, H, [160.0, 120.0], 12.0);
        let mut tracker = TemplateTracker::default();
        assert!(tracker.update(&frame).is_none());
        assert!(tracker.center().is_none());
        assert!(!tracker.is_initialized());
    }

    #[test]
    fn test_self_match_on_same_frame() {
        let frame = blob_frame(W, H, [150.0, 110.0], 12.0);
        let rect = PixelRect::new(130, 90, 40, 40);
        let mut tracker = TemplateTracker::default();
        tracker.initialize(&frame, rect).unwrap();
        assert_eq!(tracker.center(), Some([150.0, 110.0]));

        let res = tracker.update(&frame).unwrap();
        assert!((res.rect.x - rect.x).abs() <= 1);
        assert!((res.rect.y - rect.y).abs() <= 1);
        assert_eq!((res.rect.width, res.rect.height), (40, 40));
        assert_abs_diff_eq!(res.score, 1.0, epsilon = 1e-4);
        // Stationary target keeps the estimate in place.
        let est = tracker.center().unwrap();
        assert_abs_diff_eq!(est[0], 150.0, epsilon = 1e-9);
        assert_abs_diff_eq!(est[1], 110.0, epsilon = 1e-9);
    }

    #[test]
    fn test_follows_moving_blob() {
        let start = [100.0, 100.0];
        let mut tracker = TemplateTracker::default();
        let first = blob_frame(W, H, start, 10.0);
        tracker
            .initialize(&first, PixelRect::new(80, 80, 40, 40))
            .unwrap();

        // 6 px per frame, well inside the 64 px window.
        let mut last = None;
        for k in 1..=10 {
            let c = [start[0] + 6.0 * k as f64, start[1] + 3.0 * k as f64];
            let frame = blob_frame(W, H, c, 10.0);
            let res = tracker.update(&frame).unwrap();
            let m = res.center();
            assert!((m[0] - c[0]).abs() <= 1.0, "frame {k}: x {} vs {}", m[0], c[0]);
            assert!((m[1] - c[1]).abs() <= 1.0, "frame {k}: y {} vs {}", m[1], c[1]);
            assert!(res.score > 0.9);
            last = Some(c);
        }

        // Estimate lags the match because of the 0.6 / 0.4 blend.
        let est = tracker.center().unwrap();
        let c = last.unwrap();
        assert!((est[0] - c[0]).abs() < 7.0);
        assert!((est[1] - c[1]).abs() < 4.0);
    }

    #[test]
    fn test_position_blend() {
        let mut tracker = TemplateTracker::default();
        let first = blob_frame(W, H, [100.0, 100.0], 10.0);
        tracker
            .initialize(&first, PixelRect::new(80, 80, 40, 40))
            .unwrap();

        let moved = blob_frame(W, H, [120.0, 100.0], 10.0);
        let res = tracker.update(&moved).unwrap();
        assert_eq!(res.rect, PixelRect::new(100, 80, 40, 40));
        let est = tracker.center().unwrap();
        assert_abs_diff_eq!(est[0], 0.6 * 120.0 + 0.4 * 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(est[1], 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rgba_frames() {
        let frame = blob_frame_rgba(W, H, [200.0, 60.0], 9.0);
        let mut tracker = TemplateTracker::default();
        tracker
            .initialize(&frame, PixelRect::new(180, 40, 40, 40))
            .unwrap();
        let res = tracker.update(&frame).unwrap();
        assert_eq!(res.rect, PixelRect::new(180, 40, 40, 40));
    }

    #[test]
    fn test_invalid_regions() {
        let frame = blob_frame(W, H, [160.0, 120.0], 12.0);
        let mut tracker = TemplateTracker::default();
        for rect in [
            PixelRect::new(10, 10, 0, 20),
            PixelRect::new(10, 10, 20, -3),
            PixelRect::new(-1, 10, 20, 20),
            PixelRect::new(310, 10, 20, 20),
            PixelRect::new(10, 230, 20, 20),
        ] {
            let err = tracker.initialize(&frame, rect).unwrap_err();
            assert!(matches!(err, TrackerError::InvalidRegion { .. }));
        }
        assert!(!tracker.is_initialized());

        // A failed re-initialization keeps the previous template.
        tracker
            .initialize(&frame, PixelRect::new(140, 100, 40, 40))
            .unwrap();
        assert!(tracker
            .initialize(&frame, PixelRect::new(0, 0, 400, 10))
            .is_err());
        assert_eq!(tracker.center(), Some([160.0, 120.0]));
        assert_eq!(tracker.template().map(|t| t.width()), Some(40));
    }

    #[test]
    fn test_window_clamped_at_border() {
        let frame = blob_frame(W, H, [20.0, 20.0], 8.0);
        let mut tracker = TemplateTracker::default();
        tracker
            .initialize(&frame, PixelRect::new(0, 0, 40, 40))
            .unwrap();
        let res = tracker.update(&frame).unwrap();
        assert_eq!(res.rect, PixelRect::new(0, 0, 40, 40));
    }

    #[test]
    fn test_frame_shrunk_below_template() {
        let frame = blob_frame(W, H, [160.0, 120.0], 12.0);
        let mut tracker = TemplateTracker::default();
        tracker
            .initialize(&frame, PixelRect::new(140, 100, 40, 40))
            .unwrap();
        let before = tracker.center();

        let tiny = blob_frame(30, 30, [15.0, 15.0], 5.0);
        assert!(tracker.update(&tiny).is_none());
        assert_eq!(tracker.center(), before);
    }
}
