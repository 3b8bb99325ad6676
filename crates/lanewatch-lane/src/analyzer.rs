use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};
use lanewatch_preprocess::Line;
use lanewatch_segment::{morph, FOREGROUND};
use log::{debug, trace, warn};
use ndarray::{Array2, ArrayView2};

use crate::candidates::{candidate_polylines, fit_lines, CandidateParams};
use crate::{LaneConfig, LaneError, LaneModel, Result, Roi};

/// Smallest ROI side the analyzer works with.
const MIN_ROI_SIDE: u32 = 80;
/// Reference row as a fraction of ROI height.
const REF_ROW_RATIO: f64 = 0.92;
/// Synthetic vanishing point height above the ROI, fraction of ROI height.
const VP_HEIGHT_RATIO: f64 = 0.35;
const MIN_LANE_WIDTH: f64 = 40.0;
/// Minimum boundary separation at the reference row.
const MIN_BOUNDARY_GAP: f64 = 6.0;

pub struct LaneAnalyzer {
    config: LaneConfig,
}

impl LaneAnalyzer {
    pub fn new(config: LaneConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LaneConfig {
        &self.config
    }

    /// Build the lane model for one frame.
    ///
    /// `prob` is the lane-line probability map `(H, W)`; it is resized
    /// bilinearly when it does not match the frame. `drivable` is a 0/255
    /// frame-sized mask used for gating and corridor estimation; a mask of
    /// the wrong size is ignored.
    pub fn analyze(
        &self,
        prob: ArrayView2<'_, f32>,
        frame_w: u32,
        frame_h: u32,
        drivable: Option<&GrayImage>,
    ) -> Result<LaneModel> {
        if prob.is_empty() {
            return Err(LaneError::EmptyProbabilityMap);
        }
        if frame_w == 0 || frame_h == 0 {
            return Err(LaneError::InvalidFrameSize(frame_w, frame_h));
        }

        let cfg = &self.config;
        let total = cfg.total_lanes();
        let ego = cfg.ego_lane();

        let roi = self.roi(frame_w, frame_h)?;
        let prob = fit_to_frame(prob, frame_w, frame_h);

        // lane-line mask
        let thr = cfg.prob_threshold();
        let raw = GrayImage::from_fn(roi.width, roi.height, |x, y| {
            let p = prob[[(roi.y + y) as usize, (roi.x + x) as usize]];
            Luma([if p > thr { FOREGROUND } else { 0 }])
        });
        let mut lane_mask = morph::open_close(&raw, cfg.lane_open_kernel, cfg.lane_close_kernel);

        let drive_roi = match drivable {
            Some(d) if cfg.use_drivable_gate && d.dimensions() == (frame_w, frame_h) => {
                let crop = imageops::crop_imm(d, roi.x, roi.y, roi.width, roi.height).to_image();
                let eroded = morph::erode_square(&crop, cfg.gate_erode_kernel);
                lane_mask = morph::and(&lane_mask, &eroded)?;
                Some(eroded)
            }
            Some(d) if cfg.use_drivable_gate => {
                warn!(
                    "drivable mask {:?} does not match frame {}x{}; gating skipped",
                    d.dimensions(),
                    frame_w,
                    frame_h
                );
                None
            }
            _ => None,
        };

        let sample_ys = self.sample_ys(roi.height as i32);
        let (roi_w, roi_h) = (roi.width as f64, roi.height as f64);
        let ref_row = ((roi_h * REF_ROW_RATIO) as i32).clamp(0, roi.height as i32 - 1);
        let y_ref = ref_row as f64;

        let (candidates, cand_lines) = if cfg.snap_to_candidates {
            let params = CandidateParams {
                peak_min_gap: cfg.peak_min_gap_px,
                follow_window: cfg.follow_window_px,
                band_count: sample_ys.len(),
            };
            let polys = candidate_polylines(&lane_mask, drive_roi.as_ref(), &sample_ys, &params);
            let lines = fit_lines(&polys);
            (polys, lines)
        } else {
            (Vec::new(), Vec::new())
        };

        // expected boundary positions at the reference row
        let (cor_l, cor_r) = match corridor_at_row(drive_roi.as_ref(), ref_row) {
            Some((l, r)) if (r - l) as f64 >= roi_w * 0.35 => (l, r),
            _ => (0, roi.width as i32 - 1),
        };
        let lane_w = ((cor_r - cor_l) as f64 / total as f64).max(MIN_LANE_WIDTH);
        let center_x = roi_w * 0.5;
        let expected: Vec<f64> = (0..=total)
            .map(|j| (center_x + (j as f64 - (ego as f64 - 0.5)) * lane_w).clamp(0.0, roi_w - 1.0))
            .collect();

        // ego boundaries from candidates
        let snap_win = cfg.expected_window_px.max(40) as f64;
        let mut used = vec![false; cand_lines.len()];
        let mut pick = |ex: f64| -> Option<Line> {
            let (i, dx) = nearest(&cand_lines, y_ref, ex, |i| !used[i])?;
            if dx > snap_win {
                return None;
            }
            used[i] = true;
            Some(cand_lines[i])
        };
        let ego_l = pick(expected[ego - 1]);
        let ego_r = pick(expected[ego]);

        let mut vp = (center_x, -roi_h * VP_HEIGHT_RATIO);
        if let (Some(l), Some(r)) = (ego_l, ego_r) {
            if let Some(inter) = l.intersect(&r) {
                if inter.1 < roi_h * 0.2 && (inter.0 - center_x).abs() < roi_w * 0.7 {
                    vp = inter;
                }
            }
        }

        let mut boundaries: Vec<Line> = expected
            .iter()
            .map(|&x_ref| {
                let mut dy = y_ref - vp.1;
                if dy.abs() < 1e-6 {
                    dy = 1e-6;
                }
                let m = (x_ref - vp.0) / dy;
                Line::new(m, x_ref - m * y_ref)
            })
            .collect();

        let follow_win = cfg.follow_window_px.max(25) as f64;
        for (j, b) in boundaries.iter_mut().enumerate() {
            let is_ego = (j == ego - 1 && ego_l.is_some()) || (j == ego && ego_r.is_some());
            if is_ego {
                continue;
            }
            if let Some((i, dx)) = nearest(&cand_lines, y_ref, b.x_at(y_ref), |_| true) {
                if dx <= follow_win {
                    *b = cand_lines[i];
                }
            }
        }
        if let Some(l) = ego_l {
            boundaries[ego - 1] = l;
        }
        if let Some(r) = ego_r {
            boundaries[ego] = r;
        }

        enforce_spacing(&mut boundaries, y_ref, MIN_BOUNDARY_GAP);

        debug!(
            "lanes: roi {:?}, lane width {:.1}, vp ({:.1}, {:.1}), {} candidates, ego snapped L={} R={}",
            roi,
            lane_w,
            vp.0,
            vp.1,
            cand_lines.len(),
            ego_l.is_some(),
            ego_r.is_some()
        );

        Ok(LaneModel {
            roi,
            total_lanes: total,
            ego_lane: ego,
            sample_ys,
            boundaries,
            vanishing_point: vp,
            ref_row,
            lane_mask,
            drivable_mask: drive_roi,
            candidates,
        })
    }

    fn roi(&self, frame_w: u32, frame_h: u32) -> Result<Roi> {
        let (w, h) = (frame_w as i64, frame_h as i64);
        let y0 = ((h as f64 * self.config.roi_y_start_ratio as f64) as i64).min(h - 2).max(0);
        let margin = ((w as f64 * self.config.roi_x_margin_ratio as f64) as i64).min(w / 4).max(0);

        let roi = Roi {
            x: margin as u32,
            y: y0 as u32,
            width: (w - 2 * margin).max(0) as u32,
            height: (h - y0).max(0) as u32,
        };
        if roi.width < MIN_ROI_SIDE || roi.height < MIN_ROI_SIDE {
            return Err(LaneError::RoiTooSmall(roi));
        }
        Ok(roi)
    }

    /// Evenly spaced rows from the bottom sample ratio up to the top one.
    fn sample_ys(&self, roi_h: i32) -> Vec<i32> {
        let n = self.config.sample_band_count.clamp(8, 40) as usize;
        let (top, bot) = self.config.sample_span(roi_h);
        (0..n)
            .map(|i| {
                let t = i as f64 / (n - 1) as f64;
                let y = (bot as f64 + (top - bot) as f64 * t).round() as i32;
                y.clamp(0, roi_h - 1)
            })
            .collect()
    }
}

/// Bilinear resize of `prob` to the frame size when needed.
fn fit_to_frame(prob: ArrayView2<'_, f32>, frame_w: u32, frame_h: u32) -> Array2<f32> {
    let (h, w) = prob.dim();
    if (w as u32, h as u32) == (frame_w, frame_h) {
        return prob.to_owned();
    }
    trace!("resizing lane probability {}x{} -> {}x{}", w, h, frame_w, frame_h);
    let src: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(w as u32, h as u32, |x, y| Luma([prob[[y as usize, x as usize]]]));
    let dst = imageops::resize(&src, frame_w, frame_h, FilterType::Triangle);
    Array2::from_shape_fn((frame_h as usize, frame_w as usize), |(y, x)| {
        dst.get_pixel(x as u32, y as u32)[0]
    })
}

/// Leftmost / rightmost drivable columns on `row`, if the span covers at
/// least a quarter of the mask width.
fn corridor_at_row(drive: Option<&GrayImage>, row: i32) -> Option<(i32, i32)> {
    let drive = drive?;
    let (w, h) = drive.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let y = row.clamp(0, h as i32 - 1) as u32;
    let on = |x: &u32| drive.get_pixel(*x, y)[0] > 0;
    let l = (0..w).find(on)? as i32;
    let r = (0..w).rev().find(on)? as i32;
    if (r - l) as f64 >= w as f64 * 0.25 {
        Some((l, r))
    } else {
        None
    }
}

/// Index and distance of the line closest to `x` at row `y`.
fn nearest(lines: &[Line], y: f64, x: f64, allowed: impl Fn(usize) -> bool) -> Option<(usize, f64)> {
    lines
        .iter()
        .enumerate()
        .filter(|(i, _)| allowed(*i))
        .map(|(i, l)| (i, (l.x_at(y) - x).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Shift intercepts so consecutive boundaries are at least `gap` apart at `y`.
fn enforce_spacing(boundaries: &mut [Line], y: f64, gap: f64) {
    for i in 1..boundaries.len() {
        let prev = boundaries[i - 1].x_at(y);
        let cur = boundaries[i].x_at(y);
        if cur < prev + gap {
            boundaries[i].b += prev + gap - cur;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(w: usize, h: usize) -> Array2<f32> {
        Array2::zeros((h, w))
    }

    #[test]
    fn empty_or_tiny_input_is_rejected() {
        let a = LaneAnalyzer::new(LaneConfig::default());
        let empty = Array2::<f32>::zeros((0, 0));
        assert!(matches!(a.analyze(empty.view(), 1280, 720, None), Err(LaneError::EmptyProbabilityMap)));
        assert!(matches!(a.analyze(blank(8, 8).view(), 0, 720, None), Err(LaneError::InvalidFrameSize(0, 720))));
        assert!(matches!(a.analyze(blank(8, 8).view(), 320, 120, None), Err(LaneError::RoiTooSmall(_))));
    }

    #[test]
    fn analytic_boundaries_for_a_1280x720_frame() {
        let a = LaneAnalyzer::new(LaneConfig::default());
        let m = a.analyze(blank(1280, 720).view(), 1280, 720, None).unwrap();

        // y0 = 374, margin = 25
        assert_eq!(m.roi, Roi { x: 25, y: 374, width: 1230, height: 346 });
        assert_eq!(m.boundaries.len(), 6);
        assert_eq!(m.sample_ys.len(), 18);
        assert_eq!(m.ref_row, 318);

        // lane width = 1229 / 5, ego boundaries straddle the ROI centre
        let lane_w = 1229.0 / 5.0;
        let y = m.ref_row as f64;
        let xl = m.boundaries[2].x_at(y);
        let xr = m.boundaries[3].x_at(y);
        assert!((xl - (615.0 - 0.5 * lane_w)).abs() < 1e-6);
        assert!((xr - (615.0 + 0.5 * lane_w)).abs() < 1e-6);

        // every boundary passes through the vanishing point
        let (vx, vy) = m.vanishing_point;
        assert!((vy + 346.0 * 0.35).abs() < 1e-9);
        for l in &m.boundaries {
            assert!((l.x_at(vy) - vx).abs() < 1e-6);
        }

        // clamped outer boundaries still ordered
        let xs: Vec<f64> = m.boundaries.iter().map(|l| l.x_at(y)).collect();
        assert!(xs.windows(2).all(|w| w[1] >= w[0] + MIN_BOUNDARY_GAP - 1e-9));
    }

    #[test]
    fn ego_lane_contains_the_roi_centre() {
        let a = LaneAnalyzer::new(LaneConfig::default());
        let m = a.analyze(blank(1280, 720).view(), 1280, 720, None).unwrap();
        assert_eq!(m.lane_number(640, 700), Some(3));
        assert_eq!(m.lane_number(30, 700), Some(1));
        assert_eq!(m.lane_number(1250, 700), Some(5));
        assert_eq!(m.lane_number(640, 100), None);
    }

    #[test]
    fn narrow_corridor_falls_back_to_full_width() {
        let a = LaneAnalyzer::new(LaneConfig::default());
        let mut drive = GrayImage::new(1280, 720);
        for y in 374..720 {
            for x in 600..700 {
                drive.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
        let with = a.analyze(blank(1280, 720).view(), 1280, 720, Some(&drive)).unwrap();
        let without = a.analyze(blank(1280, 720).view(), 1280, 720, None).unwrap();
        assert_eq!(with.boundaries, without.boundaries);
        assert!(with.drivable_mask.is_some());
    }

    #[test]
    fn wide_corridor_sets_lane_width() {
        let a = LaneAnalyzer::new(LaneConfig::default());
        let mut drive = GrayImage::new(1280, 720);
        // ROI-local corridor 200..=1000 after erosion by 4 px each side
        for y in 300..720 {
            for x in (25 + 196)..(25 + 1005) {
                drive.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
        let m = a.analyze(blank(1280, 720).view(), 1280, 720, Some(&drive)).unwrap();
        let y = m.ref_row as f64;
        let w = m.boundaries[3].x_at(y) - m.boundaries[2].x_at(y);
        assert!((w - 800.0 / 5.0).abs() < 1e-6, "lane width {w}");
    }

    #[test]
    fn drivable_mask_of_wrong_size_is_ignored() {
        let a = LaneAnalyzer::new(LaneConfig::default());
        let drive = GrayImage::new(640, 640);
        let m = a.analyze(blank(1280, 720).view(), 1280, 720, Some(&drive)).unwrap();
        assert!(m.drivable_mask.is_none());
    }

    #[test]
    fn mismatched_probability_map_is_resized() {
        let a = LaneAnalyzer::new(LaneConfig::default());
        let prob = Array2::from_elem((360, 640), 0.9f32);
        let m = a.analyze(prob.view(), 1280, 720, None).unwrap();
        assert_eq!(m.lane_mask.dimensions(), (1230, 346));
        assert!(m.lane_mask.pixels().all(|p| p[0] == FOREGROUND));
    }

    #[test]
    fn snapping_locks_ego_boundaries_to_painted_lines() {
        let cfg = LaneConfig { snap_to_candidates: true, ..Default::default() };
        let a = LaneAnalyzer::new(cfg);

        // two painted lines near the analytic ego boundaries, 6 px wide
        let mut prob = blank(1280, 720);
        for y in 374..720 {
            for dx in 0..6 {
                prob[[y, 25 + 480 + dx]] = 1.0;
                prob[[y, 25 + 760 + dx]] = 1.0;
            }
        }
        let m = a.analyze(prob.view(), 1280, 720, None).unwrap();
        assert!(!m.candidates.is_empty());

        let y = m.ref_row as f64;
        assert!((m.boundaries[2].x_at(y) - 480.0).abs() <= 1.0);
        assert!((m.boundaries[3].x_at(y) - 760.0).abs() <= 1.0);
        // parallel ego lines never intersect, so the synthetic point stays
        assert!((m.vanishing_point.1 + 346.0 * 0.35).abs() < 1e-9);
    }
}
