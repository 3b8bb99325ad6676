use lanewatch_detect::{iou, BoxRect};

/// Result of associating one frame's detections with the live tracks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assignment {
    /// `(track index, detection index)` pairs.
    pub matches: Vec<(usize, usize)>,
    /// Track indices with no detection this frame.
    pub unmatched_tracks: Vec<usize>,
    /// Detection indices that continue no track.
    pub unmatched_detections: Vec<usize>,
}

/// Detection ↔ track association strategy.
pub trait Matcher {
    fn assign(&self, tracks: &[BoxRect], detections: &[BoxRect]) -> Assignment;
}

/// Tracks, in order, each take the unused detection they overlap most,
/// provided the IoU exceeds `min_iou`.
#[derive(Clone, Debug)]
pub struct GreedyIouMatcher {
    pub min_iou: f32,
}

impl GreedyIouMatcher {
    pub fn new(min_iou: f32) -> Self {
        Self { min_iou }
    }
}

impl Matcher for GreedyIouMatcher {
    fn assign(&self, tracks: &[BoxRect], detections: &[BoxRect]) -> Assignment {
        let mut used = vec![false; detections.len()];
        let mut out = Assignment::default();

        for (ti, tb) in tracks.iter().enumerate() {
            let mut best: Option<usize> = None;
            let mut best_iou = self.min_iou;
            for (di, db) in detections.iter().enumerate() {
                if used[di] {
                    continue;
                }
                let v = iou(tb, db);
                if v > best_iou {
                    best_iou = v;
                    best = Some(di);
                }
            }
            match best {
                Some(di) => {
                    used[di] = true;
                    out.matches.push((ti, di));
                }
                None => out.unmatched_tracks.push(ti),
            }
        }

        out.unmatched_detections = (0..detections.len()).filter(|&i| !used[i]).collect();
        out
    }
}
