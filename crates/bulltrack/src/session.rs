//! Per-run orchestration: calibration, target selection, frame loop.
//!
//! [`TrackingSession`] owns every piece of mutable state of a run. The
//! phases are sequential by construction (`&mut self`), so a calibration can
//! never be swapped out in the middle of a frame.

use image::{GenericImageView, Pixel};

use crate::arena::{ArenaCalibration, CalibrationError};
use crate::config::SessionConfig;
use crate::tracker::{PixelRect, TemplateTracker, TrackResult, TrackerConfig, TrackerError};
use crate::trajectory::{Trajectory, TrajectoryAccumulator, TrajectoryConfig, TrajectorySample};

/// What one frame produced.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FrameOutcome {
    pub track: TrackResult,
    /// Present when the session is calibrated and the step was recorded.
    pub sample: Option<TrajectorySample>,
}

/// Tracker + optional calibration + trajectory for one run.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    tracker: TemplateTracker,
    calibration: Option<ArenaCalibration>,
    accumulator: TrajectoryAccumulator,
    n_frames: usize,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new(TrackerConfig::default(), TrajectoryConfig::default())
    }
}

impl TrackingSession {
    pub fn new(tracker: TrackerConfig, trajectory: TrajectoryConfig) -> Self {
        Self {
            tracker: TemplateTracker::new(tracker),
            calibration: None,
            accumulator: TrajectoryAccumulator::new(trajectory),
            n_frames: 0,
        }
    }

    /// Session with the tuning from `config`; calibration and selection are
    /// still explicit steps.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.tracker.clone(), config.trajectory.clone())
    }

    /// Replace the calibration. On failure the previous one stays active.
    pub fn calibrate(
        &mut self,
        clicks_px: [[f64; 2]; 4],
        diameter_m: f64,
    ) -> Result<&ArenaCalibration, CalibrationError> {
        match ArenaCalibration::from_compass_points(clicks_px, diameter_m) {
            Ok(cal) => Ok(&*self.calibration.insert(cal)),
            Err(e) => {
                tracing::warn!("calibration rejected: {}", e);
                Err(e)
            }
        }
    }

    pub fn set_calibration(&mut self, calibration: ArenaCalibration) {
        self.calibration = Some(calibration);
    }

    pub fn calibration(&self) -> Option<&ArenaCalibration> {
        self.calibration.as_ref()
    }

    /// Capture the target template from `frame`.
    pub fn select_target<I>(&mut self, frame: &I, rect: PixelRect) -> Result<(), TrackerError>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        self.tracker.initialize(frame, rect)
    }

    /// `true` once a target has been selected.
    pub fn can_track(&self) -> bool {
        self.tracker.center().is_some()
    }

    /// Track one frame and feed the matched center to the trajectory.
    ///
    /// The matched rectangle's center is recorded, not the smoothed
    /// estimate. Returns `None` when no target is selected.
    pub fn process_frame<I>(&mut self, t_ms: f64, frame: &I) -> Option<FrameOutcome>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        let track = self.tracker.update(frame)?;
        self.n_frames += 1;
        let h = self.calibration.as_ref().map(|c| &c.pixel_to_metric);
        let sample = self.accumulator.accept_at(t_ms, track.center(), h);
        Some(FrameOutcome { track, sample })
    }

    pub fn tracker(&self) -> &TemplateTracker {
        &self.tracker
    }

    pub fn trajectory(&self) -> &Trajectory {
        self.accumulator.trajectory()
    }

    pub fn total_distance_m(&self) -> f64 {
        self.accumulator.total_distance_m()
    }

    /// Frames for which the tracker returned a match.
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    pub fn n_rejected_steps(&self) -> usize {
        self.accumulator.n_rejected()
    }

    /// End the run and hand out what was recorded.
    pub fn finish(self) -> Trajectory {
        tracing::info!(
            "run finished: {} frames, {} samples, {:.2} m",
            self.n_frames,
            self.accumulator.trajectory().len(),
            self.accumulator.total_distance_m()
        );
        self.accumulator.into_trajectory()
    }
}
