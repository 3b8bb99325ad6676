use image::GrayImage;
use lanewatch_preprocess::{clip_polyline, Line};
use serde::Serialize;

/// Axis-aligned region of interest in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (rx, ry) = (self.x as i64, self.y as i64);
        let (x, y) = (x as i64, y as i64);
        x >= rx && y >= ry && x < rx + self.width as i64 && y < ry + self.height as i64
    }
}

/// Per-frame lane geometry. All line / point coordinates are ROI-local
/// unless a method says otherwise.
#[derive(Clone, Debug)]
pub struct LaneModel {
    pub roi: Roi,
    pub total_lanes: usize,
    pub ego_lane: usize,
    /// Rendering rows, bottom to top.
    pub sample_ys: Vec<i32>,
    /// `total_lanes + 1` lines, left to right.
    pub boundaries: Vec<Line>,
    pub vanishing_point: (f64, f64),
    /// Row at which the expected lane positions are anchored.
    pub ref_row: i32,
    /// Thresholded (and gated) lane-line mask, ROI-sized.
    pub lane_mask: GrayImage,
    /// Eroded drivable mask, ROI-sized, when gating was applied.
    pub drivable_mask: Option<GrayImage>,
    /// Pixel-stitched candidate polylines; empty unless snapping is on.
    pub candidates: Vec<Vec<(i32, i32)>>,
}

impl LaneModel {
    /// 1-based lane of a frame point, `None` outside the ROI.
    ///
    /// Boundaries are forced at least 2 px apart at the query row so the
    /// result never decreases as `x` grows.
    pub fn lane_number(&self, x: i32, y: i32) -> Option<usize> {
        if self.boundaries.len() != self.total_lanes + 1 || !self.roi.contains(x, y) {
            return None;
        }
        let xr = (x - self.roi.x as i32) as f64;
        let yr = (y - self.roi.y as i32) as f64;

        let mut xs: Vec<f64> = self.boundaries.iter().map(|l| l.x_at(yr)).collect();
        for i in 1..xs.len() {
            if xs[i] < xs[i - 1] + 2.0 {
                xs[i] = xs[i - 1] + 2.0;
            }
        }

        let idx = xs.iter().take_while(|&&bx| xr >= bx).count();
        Some(idx.clamp(1, self.total_lanes))
    }

    /// Boundary lines evaluated at the sample rows, clamped to the ROI and
    /// shifted to frame coordinates.
    pub fn boundary_polylines(&self) -> Vec<Vec<(i32, i32)>> {
        self.boundaries
            .iter()
            .map(|line| {
                let pts: Vec<(f64, f64)> = self.sample_ys.iter().map(|&y| (line.x_at(y as f64), y as f64)).collect();
                self.to_frame(clip_polyline(&pts, self.roi.width, self.roi.height))
            })
            .collect()
    }

    /// Candidate polylines in frame coordinates.
    pub fn candidate_polylines(&self) -> Vec<Vec<(i32, i32)>> {
        self.candidates.iter().map(|c| self.to_frame(c.clone())).collect()
    }

    /// Label anchor (frame coordinates) for each lane, `(lane, point)`.
    /// Anchors sit midway between the lane's boundaries at 92 % of ROI height.
    pub fn label_points(&self) -> Vec<(usize, (i32, i32))> {
        if self.boundaries.len() != self.total_lanes + 1 || self.roi.height == 0 {
            return Vec::new();
        }
        let max_x = (self.roi.width.max(1) - 1) as f64;
        let y = ((self.roi.height as f64 * 0.92) as i32).clamp(0, self.roi.height as i32 - 1);
        self.boundaries
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let cx = ((pair[0].x_at(y as f64) + pair[1].x_at(y as f64)) * 0.5).round().clamp(0.0, max_x);
                (i + 1, (self.roi.x as i32 + cx as i32, self.roi.y as i32 + y))
            })
            .collect()
    }

    fn to_frame(&self, pts: Vec<(i32, i32)>) -> Vec<(i32, i32)> {
        let (ox, oy) = (self.roi.x as i32, self.roi.y as i32);
        pts.into_iter().map(|(x, y)| (x + ox, y + oy)).collect()
    }
}
