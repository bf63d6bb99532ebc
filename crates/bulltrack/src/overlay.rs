//! Debug overlay: arena border, pixel trail and last match drawn on a frame.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::arena::{ArenaCalibration, DEFAULT_BOUNDARY_STEP_DEG};
use crate::tracker::TrackResult;
use crate::trajectory::Trajectory;

const BOUNDARY_COLOR: Rgb<u8> = Rgb([0x88, 0x88, 0x88]);
const TRAIL_COLOR: Rgb<u8> = Rgb([0x58, 0xa6, 0xff]);
const MATCH_COLOR: Rgb<u8> = Rgb([0x4c, 0xaf, 0x50]);

fn draw_polyline(canvas: &mut RgbImage, pts: &[[f64; 2]], color: Rgb<u8>) {
    for w in pts.windows(2) {
        draw_line_segment_mut(
            canvas,
            (w[0][0] as f32, w[0][1] as f32),
            (w[1][0] as f32, w[1][1] as f32),
            color,
        );
    }
}

/// Copy of `frame` with the run annotations drawn on top.
pub fn render_overlay(
    frame: &RgbImage,
    calibration: Option<&ArenaCalibration>,
    trajectory: &Trajectory,
    last_match: Option<&TrackResult>,
) -> RgbImage {
    let mut canvas = frame.clone();

    if let Some(cal) = calibration {
        draw_polyline(
            &mut canvas,
            &cal.boundary_px(DEFAULT_BOUNDARY_STEP_DEG),
            BOUNDARY_COLOR,
        );
    }

    draw_polyline(&mut canvas, &trajectory.pixel_trail, TRAIL_COLOR);

    if let Some(m) = last_match {
        if m.rect.width > 0 && m.rect.height > 0 {
            let rect =
                Rect::at(m.rect.x, m.rect.y).of_size(m.rect.width as u32, m.rect.height as u32);
            draw_hollow_rect_mut(&mut canvas, rect, MATCH_COLOR);
        }
        let [cx, cy] = m.center();
        let c = (cx.round() as i32, cy.round() as i32);
        draw_hollow_circle_mut(&mut canvas, c, 3, MATCH_COLOR);
    }

    canvas
}
