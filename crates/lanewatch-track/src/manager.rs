use lanewatch_detect::{BoxRect, Detection};
use lanewatch_lane::LaneModel;
use log::{debug, trace};

use crate::{GreedyIouMatcher, Matcher, Result, Track, TrackConfig, TrackError};

/// Owns the live track set.
pub struct TrackManager {
    config: TrackConfig,
    matcher: Box<dyn Matcher + Send>,
    tracks: Vec<Track>,
    next_id: u64,
    total_lanes: usize,
}

impl TrackManager {
    pub fn new(config: TrackConfig) -> Self {
        let matcher = GreedyIouMatcher::new(config.match_iou);
        Self::with_matcher(config, Box::new(matcher))
    }

    pub fn with_matcher(config: TrackConfig, matcher: Box<dyn Matcher + Send>) -> Self {
        Self { config, matcher, tracks: Vec::new(), next_id: 1, total_lanes: 0 }
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    /// Live tracks in creation order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, id: u64) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Advance every track by one frame.
    ///
    /// Matched tracks are updated, unmatched ones age, leftover detections
    /// start new tracks and tracks past the miss limit are dropped. Every
    /// live track's violation verdict is then re-evaluated. Returns
    /// the track id assigned to each detection, in input order.
    pub fn step(&mut self, detections: &[Detection], ts_ms: f64, lanes: Option<&LaneModel>) -> Result<Vec<u64>> {
        if !ts_ms.is_finite() {
            return Err(TrackError::InvalidTimestamp(ts_ms));
        }
        if let Some(m) = lanes {
            self.total_lanes = m.total_lanes;
        }

        let track_boxes: Vec<BoxRect> = self.tracks.iter().map(|t| t.last_box()).collect();
        let det_boxes: Vec<BoxRect> = detections.iter().map(|d| d.bbox).collect();
        let assignment = self.matcher.assign(&track_boxes, &det_boxes);

        let mut ids = vec![0u64; detections.len()];
        for &(ti, di) in &assignment.matches {
            let d = &detections[di];
            let lane = lane_of(lanes, &d.bbox);
            let t = &mut self.tracks[ti];
            t.update(d.class_id, d.bbox, ts_ms, lane, &self.config);
            ids[di] = t.id();
        }
        for &ti in &assignment.unmatched_tracks {
            self.tracks[ti].missed();
        }
        for &di in &assignment.unmatched_detections {
            let d = &detections[di];
            let lane = lane_of(lanes, &d.bbox);
            let t = Track::new(self.next_id, d.class_id, d.bbox, ts_ms, lane, &self.config);
            ids[di] = t.id();
            trace!("new track {} class {} at {:?}", t.id(), d.class_id, d.bbox);
            self.next_id += 1;
            self.tracks.push(t);
        }

        // verdicts follow the current lane count, matched or not
        for t in &mut self.tracks {
            t.check_violation(self.total_lanes, &self.config);
        }

        let before = self.tracks.len();
        let cfg = &self.config;
        self.tracks.retain(|t| !t.is_evictable(cfg));

        debug!(
            "tracks: {} matched, {} missed, {} new, {} evicted, {} live",
            assignment.matches.len(),
            assignment.unmatched_tracks.len(),
            assignment.unmatched_detections.len(),
            before - self.tracks.len(),
            self.tracks.len()
        );
        Ok(ids)
    }
}

/// Lane under the bottom centre of a box, where the vehicle meets the road.
fn lane_of(lanes: Option<&LaneModel>, bbox: &BoxRect) -> Option<usize> {
    let (x, y) = bbox.bottom_center();
    lanes?.lane_number(x, y - 1)
}
