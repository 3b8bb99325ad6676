use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Track, TrackConfig};

/// Where a vehicle crossed the counting line, by horizontal third.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "F")]
    Forward,
    #[serde(rename = "R")]
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "L",
            Direction::Forward => "F",
            Direction::Right => "R",
        }
    }
}

/// Counts every track once, the first frame its centre is below the
/// counting line.
#[derive(Debug)]
pub struct DirectionCounter {
    line_ratio: f32,
    left_ratio: f32,
    right_ratio: f32,
    counted: HashSet<u64>,
    left: u64,
    forward: u64,
    right: u64,
}

impl DirectionCounter {
    pub fn new(cfg: &TrackConfig) -> Self {
        Self {
            line_ratio: cfg.count_line_ratio,
            left_ratio: cfg.left_split_ratio,
            right_ratio: cfg.right_split_ratio,
            counted: HashSet::new(),
            left: 0,
            forward: 0,
            right: 0,
        }
    }

    pub fn classify(&self, x: i32, frame_w: u32) -> Direction {
        let x = x as f32;
        let w = frame_w as f32;
        if x < w * self.left_ratio {
            Direction::Left
        } else if x > w * self.right_ratio {
            Direction::Right
        } else {
            Direction::Forward
        }
    }

    /// Count tracks crossing this frame; returns the newly counted ones.
    pub fn update(&mut self, tracks: &[Track], frame_w: u32, frame_h: u32) -> Vec<(u64, Direction)> {
        // evicted ids never come back
        self.counted.retain(|id| tracks.iter().any(|t| t.id() == *id));

        let line_y = (frame_h as f32 * self.line_ratio) as i32;
        let mut fresh = Vec::new();
        for t in tracks {
            if self.counted.contains(&t.id()) {
                continue;
            }
            let (cx, cy) = t.last_box().center();
            if cy <= line_y {
                continue;
            }
            let dir = self.classify(cx, frame_w);
            match dir {
                Direction::Left => self.left += 1,
                Direction::Forward => self.forward += 1,
                Direction::Right => self.right += 1,
            }
            self.counted.insert(t.id());
            fresh.push((t.id(), dir));
        }
        fresh
    }

    /// `(left, forward, right)` totals so far.
    pub fn counts(&self) -> (u64, u64, u64) {
        (self.left, self.forward, self.right)
    }
}
