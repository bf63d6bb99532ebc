//! Circular arena calibration from four compass clicks on its border.

use crate::homography::{compute_homography, Homography, HomographyError};

/// Angular step (degrees) for tracing the arena border.
pub const DEFAULT_BOUNDARY_STEP_DEG: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Arena diameter must be finite and positive.
    InvalidDiameter(f64),
    Homography(HomographyError),
}

impl std::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDiameter(d) => write!(f, "invalid arena diameter: {}", d),
            Self::Homography(e) => write!(f, "calibration failed: {}", e),
        }
    }
}

impl std::error::Error for CalibrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Homography(e) => Some(e),
            Self::InvalidDiameter(_) => None,
        }
    }
}

impl From<HomographyError> for CalibrationError {
    fn from(e: HomographyError) -> Self {
        Self::Homography(e)
    }
}

/// Metric border points of a circle of radius `r` in N, E, S, W order.
///
/// Arena frame: origin at the center, x to the east, y to the north.
pub fn compass_points_m(r: f64) -> [[f64; 2]; 4] {
    [[0.0, r], [r, 0.0], [0.0, -r], [-r, 0.0]]
}

/// Pixel ↔ arena-plane mapping for one calibration.
///
/// `pixel_to_metric` and `metric_to_pixel` are computed together; a
/// calibration object never exists with only one of them.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ArenaCalibration {
    /// Arena diameter in meters.
    pub diameter_m: f64,
    /// Border clicks in N, E, S, W order (image pixels).
    pub clicks_px: [[f64; 2]; 4],
    /// Image pixels → arena meters.
    pub pixel_to_metric: Homography,
    /// Arena meters → image pixels.
    pub metric_to_pixel: Homography,
}

impl ArenaCalibration {
    /// Calibrate from the N, E, S, W border clicks and the known diameter.
    pub fn from_compass_points(
        clicks_px: [[f64; 2]; 4],
        diameter_m: f64,
    ) -> Result<Self, CalibrationError> {
        if !(diameter_m.is_finite() && diameter_m > 0.0) {
            return Err(CalibrationError::InvalidDiameter(diameter_m));
        }
        let metric = compass_points_m(0.5 * diameter_m);
        let pixel_to_metric = compute_homography(&clicks_px, &metric)?;
        let metric_to_pixel = pixel_to_metric.inverse()?;

        tracing::info!(
            "arena calibrated: diameter {:.2} m, det(H) = {:.3e}",
            diameter_m,
            pixel_to_metric.determinant()
        );

        Ok(Self {
            diameter_m,
            clicks_px,
            pixel_to_metric,
            metric_to_pixel,
        })
    }

    pub fn radius_m(&self) -> f64 {
        0.5 * self.diameter_m
    }

    pub fn to_metric(&self, pixel: [f64; 2]) -> Result<[f64; 2], HomographyError> {
        self.pixel_to_metric.apply(pixel)
    }

    pub fn to_pixel(&self, metric: [f64; 2]) -> Result<[f64; 2], HomographyError> {
        self.metric_to_pixel.apply(metric)
    }

    /// Arena border traced in pixel space, sampled every `step_deg` degrees
    /// over `0..=360`.
    ///
    /// Samples that project onto the vanishing line are dropped.
    pub fn boundary_px(&self, step_deg: f64) -> Vec<[f64; 2]> {
        let step = if step_deg.is_finite() && step_deg > 0.0 {
            step_deg
        } else {
            DEFAULT_BOUNDARY_STEP_DEG
        };
        let r = self.radius_m();
        let n = (360.0 / step).floor() as usize;

        (0..=n)
            .filter_map(|k| {
                let a = (k as f64 * step).to_radians();
                self.to_pixel([r * a.cos(), r * a.sin()]).ok()
            })
            .collect()
    }
}
