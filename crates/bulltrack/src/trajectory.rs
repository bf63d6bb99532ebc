//! Metric trajectory and path-length integration.

use std::time::Instant;

use crate::homography::Homography;

/// Step gating for the accumulator.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    /// Pixel moves at or below this distance are not recorded.
    pub min_step_px: f64,
    /// Metric steps at or above this length (meters) are not added to the
    /// total. Caps blow-ups near the vanishing line; not a physical limit.
    pub max_step_m: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            min_step_px: 1.0,
            max_step_m: 10.0,
        }
    }
}

impl TrajectoryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_step_px.is_finite() && self.min_step_px >= 0.0) {
            return Err(format!(
                "trajectory.min_step_px must be finite and >= 0, got {}",
                self.min_step_px
            ));
        }
        if !(self.max_step_m > 0.0) {
            return Err(format!(
                "trajectory.max_step_m must be positive, got {}",
                self.max_step_m
            ));
        }
        Ok(())
    }
}

/// One recorded position.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrajectorySample {
    /// Milliseconds since the run started.
    pub t_ms: f64,
    pub pixel: [f64; 2],
    /// Arena-plane position in meters.
    pub metric: [f64; 2],
    /// Path length (meters) up to and including this sample.
    pub cumulative_m: f64,
}

/// Append-only record of a run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Trajectory {
    /// Calibrated samples in acceptance order.
    pub samples: Vec<TrajectorySample>,
    /// Every accepted pixel position, calibrated or not.
    pub pixel_trail: Vec<[f64; 2]>,
}

impl Trajectory {
    pub fn total_distance_m(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.cumulative_m)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Turns tracker positions into a metric trajectory.
#[derive(Debug, Clone)]
pub struct TrajectoryAccumulator {
    config: TrajectoryConfig,
    trajectory: Trajectory,
    total_m: f64,
    n_rejected: usize,
    started: Instant,
}

impl Default for TrajectoryAccumulator {
    fn default() -> Self {
        Self::new(TrajectoryConfig::default())
    }
}

impl TrajectoryAccumulator {
    pub fn new(config: TrajectoryConfig) -> Self {
        Self {
            config,
            trajectory: Trajectory::default(),
            total_m: 0.0,
            n_rejected: 0,
            started: Instant::now(),
        }
    }

    /// [`Self::accept_at`] stamped with the time elapsed since construction.
    pub fn accept(
        &mut self,
        pixel: [f64; 2],
        h: Option<&Homography>,
    ) -> Option<TrajectorySample> {
        let t_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.accept_at(t_ms, pixel, h)
    }

    /// Record `pixel` and, when `h` is present, its metric position.
    ///
    /// - Moves of at most `min_step_px` from the last recorded pixel are
    ///   ignored entirely.
    /// - Without a homography the pixel trail still grows but no sample is
    ///   produced.
    /// - A step is added to the total only when it is finite and shorter
    ///   than `max_step_m`; the sample is appended either way, so the next
    ///   step is measured from it.
    /// - A point on the vanishing line yields no sample.
    pub fn accept_at(
        &mut self,
        t_ms: f64,
        pixel: [f64; 2],
        h: Option<&Homography>,
    ) -> Option<TrajectorySample> {
        if let Some(last) = self.trajectory.pixel_trail.last() {
            if dist(*last, pixel) <= self.config.min_step_px {
                return None;
            }
        }
        self.trajectory.pixel_trail.push(pixel);

        let h = h?;
        let metric = match h.apply(pixel) {
            Ok(m) => m,
            Err(e) => {
                self.n_rejected += 1;
                tracing::debug!(
                    "pixel ({:.1}, {:.1}) not projected: {}",
                    pixel[0],
                    pixel[1],
                    e
                );
                return None;
            }
        };

        if let Some(prev) = self.trajectory.samples.last() {
            let d = dist(prev.metric, metric);
            if d.is_finite() && d < self.config.max_step_m {
                self.total_m += d;
            } else {
                self.n_rejected += 1;
                tracing::debug!("step of {:.3} m rejected as outlier", d);
            }
        }

        let sample = TrajectorySample {
            t_ms,
            pixel,
            metric,
            cumulative_m: self.total_m,
        };
        self.trajectory.samples.push(sample);
        Some(sample)
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_m
    }

    /// Steps dropped by the outlier cap or by a degenerate projection.
    pub fn n_rejected(&self) -> usize {
        self.n_rejected
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }
}

fn dist(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}
