use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    /// Number of lanes on the carriageway (clamped to 2..=8 on use).
    pub total_lanes: u32,
    /// 1-based lane the camera vehicle drives in (clamped to 1..=total on use).
    pub ego_lane: u32,

    pub roi_y_start_ratio: f32,
    pub roi_x_margin_ratio: f32,

    pub lane_prob_threshold: f32,

    pub use_drivable_gate: bool,
    pub gate_erode_kernel: u32,

    pub lane_open_kernel: u32,
    pub lane_close_kernel: u32,

    pub sample_band_count: u32,
    pub sample_y_top_ratio: f32,
    pub sample_y_bottom_ratio: f32,

    pub peak_min_gap_px: u32,
    pub expected_window_px: u32,
    pub follow_window_px: u32,

    /// Snap analytic boundaries to lines fitted on lane-mask pixels.
    pub snap_to_candidates: bool,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            total_lanes: 5,
            ego_lane: 3,
            roi_y_start_ratio: 0.52,
            roi_x_margin_ratio: 0.02,
            lane_prob_threshold: 0.45,
            use_drivable_gate: true,
            gate_erode_kernel: 9,
            lane_open_kernel: 3,
            lane_close_kernel: 5,
            sample_band_count: 18,
            sample_y_top_ratio: 0.30,
            sample_y_bottom_ratio: 0.95,
            peak_min_gap_px: 18,
            expected_window_px: 90,
            follow_window_px: 75,
            snap_to_candidates: false,
        }
    }
}

impl LaneConfig {
    pub fn total_lanes(&self) -> usize {
        self.total_lanes.clamp(2, 8) as usize
    }

    pub fn ego_lane(&self) -> usize {
        (self.ego_lane as usize).clamp(1, self.total_lanes())
    }

    pub(crate) fn prob_threshold(&self) -> f32 {
        self.lane_prob_threshold.clamp(0.05, 0.95)
    }

    /// Top / bottom sample rows inside an ROI of height `roi_h`.
    pub(crate) fn sample_span(&self, roi_h: i32) -> (i32, i32) {
        let top = (roi_h as f32 * self.sample_y_top_ratio.clamp(0.05, 0.8)) as i32;
        let bot = (roi_h as f32 * self.sample_y_bottom_ratio.clamp(0.6, 0.99)) as i32;
        let top = top.clamp(0, roi_h - 1);
        let bot = bot.clamp(0, roi_h - 1);
        if bot <= top {
            (0, roi_h - 1)
        } else {
            (top, bot)
        }
    }
}
