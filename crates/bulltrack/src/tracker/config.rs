/// Template tracker tuning.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Half-size (pixels) of the square search window around the current
    /// position estimate.
    pub search_radius_px: u32,
    /// Step (pixels) between candidate offsets in both axes.
    pub stride_px: u32,
    /// Weight of the new best-match center in the position update:
    /// `new = blend * best + (1 - blend) * old`.
    pub position_blend: f64,
    /// Regularizer added to both patch norms in the ZNCC denominator.
    pub zncc_eps: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            search_radius_px: 64,
            stride_px: 2,
            position_blend: 0.6,
            zncc_eps: 1e-6,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.stride_px == 0 {
            return Err("tracker.stride_px must be >= 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.position_blend) {
            return Err(format!(
                "tracker.position_blend must be in [0, 1], got {}",
                self.position_blend
            ));
        }
        if !(self.zncc_eps.is_finite() && self.zncc_eps > 0.0) {
            return Err(format!(
                "tracker.zncc_eps must be finite and positive, got {}",
                self.zncc_eps
            ));
        }
        Ok(())
    }
}
