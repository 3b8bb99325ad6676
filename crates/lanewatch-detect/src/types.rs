use serde::{Deserialize, Serialize};

/// Integer rectangle in original-frame pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoxRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Integer centre, truncating like the pixel grid does.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Point where the vehicle meets the road.
    pub fn bottom_center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.bottom())
    }
}

/// One detection for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoxRect,
    pub class_id: usize,
    pub score: f32,
    pub label: Option<String>,
}

impl Detection {
    pub fn new(bbox: BoxRect, class_id: usize, score: f32) -> Self {
        Self { bbox, class_id, score, label: None }
    }
}
