use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Class votes kept per track.
    pub class_history: usize,
    /// Votes needed before the majority class replaces the latest one.
    pub stabilize_after: usize,
    /// A track is evicted once its missed count exceeds this.
    pub max_missed: u32,

    /// km/h of relative speed per pixel/second of centre motion.
    pub speed_scale: f64,
    /// Assumed speed of the recording vehicle, km/h.
    pub ego_speed_kmh: f64,
    /// Weight of the previous value in the speed EMA.
    pub speed_ema_weight: f64,

    pub speed_limit_kmh: f64,
    pub speeding_min_updates: u32,
    pub restricted_min_updates: u32,
    /// Classes barred from the inner lanes (bus, truck).
    pub restricted_classes: Vec<usize>,

    /// Minimum IoU for a detection to continue a track.
    pub match_iou: f32,

    /// Counting line as a fraction of frame height.
    pub count_line_ratio: f32,
    pub left_split_ratio: f32,
    pub right_split_ratio: f32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            class_history: 20,
            stabilize_after: 3,
            max_missed: 60,
            speed_scale: 0.1,
            ego_speed_kmh: 95.0,
            speed_ema_weight: 0.8,
            speed_limit_kmh: 120.0,
            speeding_min_updates: 6,
            restricted_min_updates: 4,
            restricted_classes: vec![5, 7],
            match_iou: 0.2,
            count_line_ratio: 0.7,
            left_split_ratio: 0.35,
            right_split_ratio: 0.65,
        }
    }
}

impl TrackConfig {
    pub(crate) fn history_cap(&self) -> usize {
        self.class_history.max(1)
    }

    pub(crate) fn ema_weight(&self) -> f64 {
        self.speed_ema_weight.clamp(0.0, 1.0)
    }
}
