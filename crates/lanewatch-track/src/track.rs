use std::collections::VecDeque;

use lanewatch_detect::BoxRect;

use crate::TrackConfig;

/// Violation reason of a track that breaks no rule.
pub const NORMAL: &str = "normal";

/// One vehicle followed across frames.
///
/// All mutation goes through [`update`](Track::update), [`missed`](Track::missed)
/// and [`check_violation`](Track::check_violation).
#[derive(Clone, Debug)]
pub struct Track {
    id: u64,
    class_id: usize,
    history: VecDeque<usize>,
    last_box: BoxRect,
    last_center: (f64, f64),
    last_ts_ms: Option<f64>,
    update_count: u32,
    lane: Option<usize>,
    speed_kmh: f64,
    speed_samples: u32,
    missed: u32,
    violation: bool,
    reason: String,
}

fn center_of(b: &BoxRect) -> (f64, f64) {
    let (x, y) = b.center();
    (x as f64, y as f64)
}

impl Track {
    /// A fresh track seeded with its first observation.
    pub fn new(id: u64, class_id: usize, bbox: BoxRect, ts_ms: f64, lane: Option<usize>, cfg: &TrackConfig) -> Self {
        let mut t = Self {
            id,
            class_id,
            history: VecDeque::with_capacity(cfg.history_cap()),
            last_box: bbox,
            last_center: center_of(&bbox),
            last_ts_ms: None,
            update_count: 0,
            lane: None,
            speed_kmh: 0.0,
            speed_samples: 0,
            missed: 0,
            violation: false,
            reason: NORMAL.to_string(),
        };
        t.update(class_id, bbox, ts_ms, lane, cfg);
        t
    }

    /// Fold one matched observation into the track.
    pub fn update(&mut self, class_id: usize, bbox: BoxRect, ts_ms: f64, lane: Option<usize>, cfg: &TrackConfig) {
        let center = center_of(&bbox);

        if let Some(prev_ts) = self.last_ts_ms {
            let dt = (ts_ms - prev_ts) / 1000.0;
            if dt > 0.0 {
                let (dx, dy) = (center.0 - self.last_center.0, center.1 - self.last_center.1);
                let px_per_s = dx.hypot(dy) / dt;
                let absolute = cfg.ego_speed_kmh + px_per_s * cfg.speed_scale;

                self.speed_kmh = if self.speed_samples == 0 {
                    absolute
                } else {
                    let w = cfg.ema_weight();
                    w * self.speed_kmh + (1.0 - w) * absolute
                };
                self.speed_samples += 1;
                self.last_center = center;
            }
        } else {
            self.last_center = center;
        }

        if self.history.len() >= cfg.history_cap() {
            self.history.pop_front();
        }
        self.history.push_back(class_id);
        self.class_id = if self.history.len() >= cfg.stabilize_after {
            majority(&self.history).unwrap_or(class_id)
        } else {
            class_id
        };

        self.last_box = bbox;
        self.last_ts_ms = Some(ts_ms);
        if lane.is_some() {
            self.lane = lane;
        }
        self.update_count += 1;
        self.missed = 0;
    }

    /// Age the track by one unmatched frame.
    pub fn missed(&mut self) {
        self.missed += 1;
    }

    pub fn is_evictable(&self, cfg: &TrackConfig) -> bool {
        self.missed > cfg.max_missed
    }

    /// Re-evaluate the violation rules against the current state and
    /// return the reason. Repeated calls on the same state agree.
    pub fn check_violation(&mut self, total_lanes: usize, cfg: &TrackConfig) -> &str {
        let mut reasons: Vec<String> = Vec::new();

        if self.speed_kmh > cfg.speed_limit_kmh && self.update_count >= cfg.speeding_min_updates {
            reasons.push(format!("speeding({:.1}km/h)", self.speed_kmh));
        }

        if cfg.restricted_classes.contains(&self.class_id) && self.update_count >= cfg.restricted_min_updates {
            if let Some(lane) = self.lane {
                if lane > 0 && lane < total_lanes {
                    reasons.push(format!("restricted lane ({lane}/{total_lanes})"));
                }
            }
        }

        self.violation = !reasons.is_empty();
        self.reason = if self.violation { reasons.join(" + ") } else { NORMAL.to_string() };
        &self.reason
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stabilised class.
    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn last_box(&self) -> BoxRect {
        self.last_box
    }

    pub fn last_timestamp_ms(&self) -> Option<f64> {
        self.last_ts_ms
    }

    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    pub fn lane(&self) -> Option<usize> {
        self.lane
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    pub fn missed_frames(&self) -> u32 {
        self.missed
    }

    pub fn is_violation(&self) -> bool {
        self.violation
    }

    pub fn violation_reason(&self) -> &str {
        &self.reason
    }
}

/// Most frequent class; ties go to the class seen first.
fn majority(history: &VecDeque<usize>) -> Option<usize> {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for &c in history {
        match counts.iter_mut().find(|(k, _)| *k == c) {
            Some((_, n)) => *n += 1,
            None => counts.push((c, 1)),
        }
    }
    let mut best: Option<(usize, usize)> = None;
    for (c, n) in counts {
        if best.map_or(true, |(_, bn)| n > bn) {
            best = Some((c, n));
        }
    }
    best.map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAR: usize = 2;
    const BUS: usize = 5;
    const TRUCK: usize = 7;

    fn bx(x: i32) -> BoxRect {
        BoxRect::new(x, 100, 40, 30)
    }

    #[test]
    fn class_follows_latest_until_enough_votes() {
        let cfg = TrackConfig::default();
        let mut t = Track::new(1, CAR, bx(0), 0.0, None, &cfg);
        t.update(TRUCK, bx(0), 40.0, None, &cfg);
        // [2, 7]: below the threshold, latest wins
        assert_eq!(t.class_id(), TRUCK);
    }

    #[test]
    fn majority_class_after_three_votes() {
        let cfg = TrackConfig::default();
        let seq = [CAR, CAR, TRUCK, CAR, CAR];
        let mut t = Track::new(1, seq[0], bx(0), 0.0, None, &cfg);
        for (i, &c) in seq.iter().enumerate().skip(1) {
            t.update(c, bx(0), 40.0 * i as f64, None, &cfg);
            assert_eq!(t.class_id(), CAR, "after {} observations", i + 1);
        }
    }

    #[test]
    fn majority_ties_go_to_first_seen() {
        let h: VecDeque<usize> = [TRUCK, CAR, CAR, TRUCK].into_iter().collect();
        assert_eq!(majority(&h), Some(TRUCK));
        let h: VecDeque<usize> = [CAR, TRUCK, BUS].into_iter().collect();
        assert_eq!(majority(&h), Some(CAR));
        assert_eq!(majority(&VecDeque::new()), None);
    }

    #[test]
    fn history_is_bounded() {
        let cfg = TrackConfig::default();
        let mut t = Track::new(1, BUS, bx(0), 0.0, None, &cfg);
        for i in 0..25 {
            t.update(CAR, bx(0), 40.0 * (i + 1) as f64, None, &cfg);
        }
        assert_eq!(t.history.len(), 20);
        assert!(t.history.iter().all(|&c| c == CAR));
    }

    #[test]
    fn speed_takes_first_sample_then_blends() {
        let cfg = TrackConfig::default();
        let mut t = Track::new(1, CAR, bx(0), 0.0, None, &cfg);
        assert_eq!(t.speed_kmh(), 0.0);

        // 100 px in 1 s
        t.update(CAR, bx(100), 1000.0, None, &cfg);
        let first = cfg.ego_speed_kmh + 100.0 * cfg.speed_scale;
        assert_eq!(t.speed_kmh(), first);

        // 200 px in 1 s
        t.update(CAR, bx(300), 2000.0, None, &cfg);
        let second = cfg.ego_speed_kmh + 200.0 * cfg.speed_scale;
        assert!((t.speed_kmh() - (0.8 * first + 0.2 * second)).abs() < 1e-9);
    }

    #[test]
    fn zero_elapsed_time_keeps_speed() {
        let cfg = TrackConfig::default();
        let mut t = Track::new(1, CAR, bx(0), 500.0, None, &cfg);
        t.update(CAR, bx(50), 500.0, None, &cfg);
        assert_eq!(t.speed_kmh(), 0.0);
        assert_eq!(t.update_count(), 2);
    }

    #[test]
    fn unknown_lane_does_not_overwrite() {
        let cfg = TrackConfig::default();
        let mut t = Track::new(1, CAR, bx(0), 0.0, Some(3), &cfg);
        t.update(CAR, bx(0), 40.0, None, &cfg);
        assert_eq!(t.lane(), Some(3));
        t.update(CAR, bx(0), 80.0, Some(4), &cfg);
        assert_eq!(t.lane(), Some(4));
    }

    #[test]
    fn truck_in_inner_lane_is_flagged() {
        let cfg = TrackConfig::default();
        let mut t = Track::new(1, TRUCK, bx(0), 0.0, Some(2), &cfg);
        for i in 1..5 {
            t.update(TRUCK, bx(0), 40.0 * i as f64, Some(2), &cfg);
        }
        assert_eq!(t.update_count(), 5);
        assert!(t.check_violation(5, &cfg).contains("restricted lane (2/5)"));
        assert!(t.is_violation());

        // outermost lanes are allowed
        t.update(TRUCK, bx(0), 400.0, Some(5), &cfg);
        assert_eq!(t.check_violation(5, &cfg), NORMAL);
        assert!(!t.is_violation());
    }

    #[test]
    fn speeding_needs_enough_updates() {
        let cfg = TrackConfig::default();
        // 35 km/h over ego speed: 350 px/s at the default scale
        let step = (35.0 / cfg.speed_scale).round() as i32;
        let mut t = Track::new(1, CAR, bx(0), 0.0, None, &cfg);
        for i in 1..5 {
            t.update(CAR, bx(step * i), 1000.0 * i as f64, None, &cfg);
        }
        assert!((t.speed_kmh() - 130.0).abs() < 1e-6);
        assert_eq!(t.check_violation(5, &cfg), NORMAL);

        t.update(CAR, bx(step * 5), 5000.0, None, &cfg);
        assert_eq!(t.update_count(), 6);
        assert!(t.check_violation(5, &cfg).contains("speeding(130.0km/h)"));
        // idempotent
        let again = t.check_violation(5, &cfg).to_string();
        assert_eq!(again, t.check_violation(5, &cfg));
    }

    #[test]
    fn moderate_car_is_normal() {
        let cfg = TrackConfig::default();
        let step = (5.0 / cfg.speed_scale).round() as i32;
        let mut t = Track::new(1, CAR, bx(0), 0.0, Some(2), &cfg);
        for i in 1..8 {
            t.update(CAR, bx(step * i), 1000.0 * i as f64, Some(2), &cfg);
        }
        assert!((t.speed_kmh() - 100.0).abs() < 1e-6);
        assert_eq!(t.check_violation(5, &cfg), "normal");
    }

    #[test]
    fn both_rules_are_joined() {
        let cfg = TrackConfig::default();
        let step = (35.0 / cfg.speed_scale).round() as i32;
        let mut t = Track::new(1, BUS, bx(0), 0.0, Some(3), &cfg);
        for i in 1..6 {
            t.update(BUS, bx(step * i), 1000.0 * i as f64, Some(3), &cfg);
        }
        assert_eq!(t.check_violation(5, &cfg), "speeding(130.0km/h) + restricted lane (3/5)");
    }

    #[test]
    fn eviction_after_max_missed() {
        let cfg = TrackConfig::default();
        let mut t = Track::new(1, CAR, bx(0), 0.0, None, &cfg);
        for _ in 0..60 {
            t.missed();
        }
        assert!(!t.is_evictable(&cfg));
        t.missed();
        assert_eq!(t.missed_frames(), 61);
        assert!(t.is_evictable(&cfg));

        t.update(CAR, bx(0), 10.0, None, &cfg);
        assert_eq!(t.missed_frames(), 0);
    }
}
