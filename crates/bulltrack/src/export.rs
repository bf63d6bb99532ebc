//! CSV / SVG / JSON serializations of a finished run.

use std::io::Write;

use crate::homography::Homography;
use crate::trajectory::Trajectory;

pub const CSV_HEADER: &str = "t_ms,x_m,y_m,dist_m";

/// One row per sample plus a closing `TOTAL` row.
pub fn write_csv<W: Write>(trajectory: &Trajectory, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for s in &trajectory.samples {
        writeln!(
            out,
            "{},{:.4},{:.4},{:.4}",
            s.t_ms.round() as i64,
            s.metric[0],
            s.metric[1],
            s.cumulative_m
        )?;
    }
    write!(out, "TOTAL,,,{:.4}", trajectory.total_distance_m())
}

pub fn to_csv_string(trajectory: &Trajectory) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_csv(trajectory, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Top-down drawing of the run in arena meters.
///
/// The view is centered on the arena with a margin of `max(2, 5% of D)`;
/// y is flipped so north points up.
pub fn to_svg_string(trajectory: &Trajectory, arena_diameter_m: f64) -> String {
    let r = 0.5 * arena_diameter_m;
    let margin = (0.05 * arena_diameter_m).max(2.0);
    let min = -(r + margin);
    let size = 2.0 * (r + margin);

    let path = trajectory
        .samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "{}{:.3},{:.3}",
                if i == 0 { 'M' } else { 'L' },
                s.metric[0],
                -s.metric[1]
            )
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="{min} {min} {size} {size}" width="1000" height="1000">
  <title>Trajectory · total distance: {total:.2} m</title>
  <g stroke-width="0.05" fill="none">
    <circle cx="0" cy="0" r="{r}" stroke="#888" />
    <path d="{path}" stroke="#58a6ff" />
  </g>
</svg>
"##,
        min = min,
        size = size,
        total = trajectory.total_distance_m(),
        r = r,
        path = path,
    )
}

/// Machine-readable run summary.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunSummary {
    pub total_distance_m: f64,
    pub n_samples: usize,
    pub n_frames: usize,
    pub n_rejected_steps: usize,
    pub arena_diameter_m: Option<f64>,
    /// Pixel → meter homography, row-major.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_to_metric: Option<Homography>,
}

impl RunSummary {
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
