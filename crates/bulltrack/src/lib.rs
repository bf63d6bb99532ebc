//! bulltrack — measure how far a bull travels in a circular arena from
//! single-camera video.
//!
//! The pipeline stages are:
//!
//! 1. **Calibration** – four clicks on the arena border (N, E, S, W) and the
//!    physical diameter give a pixel → meter homography of the arena plane.
//! 2. **Tracking** – a manually selected template is followed frame to frame
//!    by windowed ZNCC search with a blended position estimate.
//! 3. **Trajectory** – matched centers are projected to meters and integrated
//!    into a path length, skipping jitter and outlier steps.
//! 4. **Export** – CSV table, top-down SVG, JSON summary and frame overlays.
//!
//! # Public API
//! - [`TrackingSession`] drives a whole run
//! - [`TemplateTracker`], [`TrajectoryAccumulator`] and [`ArenaCalibration`]
//!   for callers that assemble the stages themselves
//! - [`compute_homography`], [`apply_homography`], [`invert_homography`] for
//!   the bare projective math
//! - [`SessionConfig`] for replaying a run from a JSON file

mod arena;
mod config;
mod export;
mod homography;
mod overlay;
mod session;
mod tracker;
mod trajectory;

#[cfg(test)]
mod test_utils;

pub use arena::{compass_points_m, ArenaCalibration, CalibrationError, DEFAULT_BOUNDARY_STEP_DEG};
pub use config::{ConfigError, SessionConfig, SESSION_SCHEMA_V1};
pub use export::{to_csv_string, to_svg_string, write_csv, RunSummary, CSV_HEADER};
pub use homography::{
    apply_homography, compute_homography, invert_homography, Homography, HomographyError,
};
pub use overlay::render_overlay;
pub use session::{FrameOutcome, TrackingSession};
pub use tracker::{
    GrayPatch, PixelRect, Template, TemplateTracker, TrackResult, TrackerConfig, TrackerError,
};
pub use trajectory::{Trajectory, TrajectoryAccumulator, TrajectoryConfig, TrajectorySample};
