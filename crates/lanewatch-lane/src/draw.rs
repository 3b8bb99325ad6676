use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::LaneModel;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Overlay the ROI outline, boundary polylines and per-lane markers.
///
/// Markers sit where the `#n` labels go: a filled dot (yellow for the ego
/// lane) with `n` small pips beneath it.
pub fn draw_boundaries(frame: &mut RgbImage, model: &LaneModel, show_candidates: bool) {
    let roi = model.roi;
    if roi.width > 0 && roi.height > 0 {
        let rect = Rect::at(roi.x as i32, roi.y as i32).of_size(roi.width, roi.height);
        draw_hollow_rect_mut(frame, rect, WHITE);
    }

    if show_candidates {
        for poly in model.candidate_polylines() {
            draw_polyline(frame, &poly, RED);
        }
    }

    for poly in model.boundary_polylines() {
        draw_polyline(frame, &poly, WHITE);
    }

    for (lane, (x, y)) in model.label_points() {
        let color = if lane == model.ego_lane { YELLOW } else { WHITE };
        draw_filled_circle_mut(frame, (x, y), 6, color);
        for pip in 0..lane as i32 {
            let px = x - 4 * (lane as i32 - 1) + 8 * pip;
            draw_filled_circle_mut(frame, (px, y + 12), 2, color);
        }
    }
}

fn draw_polyline(frame: &mut RgbImage, poly: &[(i32, i32)], color: Rgb<u8>) {
    for seg in poly.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        draw_line_segment_mut(frame, (a.0 as f32, a.1 as f32), (b.0 as f32, b.1 as f32), color);
        // second pass one pixel over for a 2 px stroke
        draw_line_segment_mut(frame, (a.0 as f32 + 1.0, a.1 as f32), (b.0 as f32 + 1.0, b.1 as f32), color);
    }
}
