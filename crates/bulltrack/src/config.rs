//! Session configuration file.
//!
//! JSON follows a versioned schema (`bulltrack.session.v1`). Tuning blocks
//! are optional and fall back to the built-in defaults field by field.

use std::path::Path;

use crate::tracker::{PixelRect, TrackerConfig};
use crate::trajectory::TrajectoryConfig;

pub const SESSION_SCHEMA_V1: &str = "bulltrack.session.v1";

const DEFAULT_FPS: f64 = 30.0;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read session config: {}", e),
            Self::Json(e) => write!(f, "failed to parse session config: {}", e),
            Self::Invalid(msg) => write!(f, "invalid session config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

/// Everything needed to replay a run offline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub schema: String,
    /// Physical arena diameter in meters.
    pub arena_diameter_m: f64,
    /// Border clicks in N, E, S, W order (pixels).
    pub calibration_px: [[f64; 2]; 4],
    /// Target rectangle on the first frame.
    pub selection: PixelRect,
    /// Frame rate used to timestamp samples.
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub trajectory: TrajectoryConfig,
}

impl SessionConfig {
    pub fn new(
        arena_diameter_m: f64,
        calibration_px: [[f64; 2]; 4],
        selection: PixelRect,
    ) -> Self {
        Self {
            schema: SESSION_SCHEMA_V1.to_string(),
            arena_diameter_m,
            calibration_px,
            selection,
            fps: DEFAULT_FPS,
            tracker: TrackerConfig::default(),
            trajectory: TrajectoryConfig::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema != SESSION_SCHEMA_V1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported schema '{}', expected '{}'",
                self.schema, SESSION_SCHEMA_V1
            )));
        }
        if !(self.arena_diameter_m.is_finite() && self.arena_diameter_m > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "arena_diameter_m must be finite and positive, got {}",
                self.arena_diameter_m
            )));
        }
        if self.calibration_px.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid(
                "calibration_px contains non-finite coordinates".to_string(),
            ));
        }
        if self.selection.width <= 0 || self.selection.height <= 0 {
            return Err(ConfigError::Invalid(format!(
                "selection must have positive size, got {}x{}",
                self.selection.width, self.selection.height
            )));
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fps must be finite and positive, got {}",
                self.fps
            )));
        }
        self.tracker.validate().map_err(ConfigError::Invalid)?;
        self.trajectory.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }

    /// Timestamp (ms) of frame `index`.
    pub fn frame_time_ms(&self, index: usize) -> f64 {
        index as f64 * 1000.0 / self.fps
    }
}
