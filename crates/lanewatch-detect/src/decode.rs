use std::collections::BTreeMap;

use lanewatch_preprocess::Letterbox;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};
use serde::{Deserialize, Serialize};

use crate::nms::non_max_suppression;
use crate::{BoxRect, DetectError, Detection, Result};

/// Rows inspected when guessing whether a box+conf+class tensor is normalised.
const NORMALISED_PROBE_ROWS: usize = 200;

/// Raw detector output layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TensorLayout {
    /// `[1, 4 + classes, anchors]` – `cx, cy, w, h` then one score per class.
    ClassScores { classes: usize, anchors: usize },
    /// `[1, anchors, 6]` – `x1, y1, x2, y2, score, class id`.
    BoxConfClass { anchors: usize },
}

impl TensorLayout {
    fn name(&self) -> &'static str {
        match self {
            TensorLayout::ClassScores { .. } => "class_scores",
            TensorLayout::BoxConfClass { .. } => "box_conf_class",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub layout: TensorLayout,
    /// Side of the square model input.
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    /// Classes of interest. Empty keeps every class.
    pub class_whitelist: Vec<usize>,
    /// Boxes narrower or shorter than this (original pixels) are noise.
    pub min_box_px: i32,
    pub labels: BTreeMap<usize, String>,
}

impl DecoderConfig {
    /// YOLOv8 COCO head restricted to car / bus / truck.
    pub fn yolov8() -> Self {
        Self {
            layout: TensorLayout::ClassScores { classes: 80, anchors: 8400 },
            input_size: 640,
            conf_threshold: 0.5,
            iou_threshold: 0.45,
            class_whitelist: vec![2, 5, 7],
            min_box_px: 10,
            labels: [(2, "car"), (5, "bus"), (7, "truck")]
                .into_iter()
                .map(|(k, v)| (k, v.to_string()))
                .collect(),
        }
    }

    /// YOLOP detection head (single vehicle class, already post-processed rows).
    pub fn yolop() -> Self {
        Self {
            layout: TensorLayout::BoxConfClass { anchors: 25200 },
            conf_threshold: 0.35,
            class_whitelist: Vec::new(),
            labels: BTreeMap::new(),
            ..Self::yolov8()
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::yolov8()
    }
}

/// Raw tensor → detections in original-frame coordinates.
#[derive(Clone, Debug)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode, filter and NMS one frame's worth of detector output.
    ///
    /// An empty tensor yields no detections; a tensor whose shape does not
    /// match the configured layout is a configuration error.
    pub fn decode(&self, tensor: ArrayViewD<'_, f32>, lb: &Letterbox) -> Result<Vec<Detection>> {
        if tensor.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.squeeze(tensor)?;

        let mut dets = match self.config.layout {
            TensorLayout::ClassScores { classes, .. } => self.decode_class_scores(rows, classes, lb),
            TensorLayout::BoxConfClass { .. } => self.decode_box_conf_class(rows, lb),
        };
        for d in &mut dets {
            d.label = self.config.labels.get(&d.class_id).cloned();
        }

        let before = dets.len();
        let kept = non_max_suppression(dets, self.config.iou_threshold);
        log::debug!("decoded {} candidates, {} after NMS", before, kept.len());
        Ok(kept)
    }

    /// Drop the batch axis and check the fixed layout shape.
    fn squeeze<'a>(&self, tensor: ArrayViewD<'a, f32>) -> Result<ArrayView2<'a, f32>> {
        let shape = tensor.shape().to_vec();
        let bad = || DetectError::InvalidOutputShape {
            layout: self.config.layout.name(),
            shape: shape.clone(),
        };

        let view = match tensor.ndim() {
            3 if shape[0] == 1 => tensor.index_axis_move(Axis(0), 0),
            2 => tensor,
            _ => return Err(bad()),
        };
        let view = view.into_dimensionality::<Ix2>().map_err(|_| bad())?;

        let expected = match self.config.layout {
            TensorLayout::ClassScores { classes, anchors } => (4 + classes, anchors),
            TensorLayout::BoxConfClass { anchors } => (anchors, 6),
        };
        if view.dim() != expected {
            return Err(bad());
        }
        Ok(view)
    }

    fn accepts_class(&self, class_id: usize) -> bool {
        self.config.class_whitelist.is_empty() || self.config.class_whitelist.contains(&class_id)
    }

    fn decode_class_scores(&self, view: ArrayView2<'_, f32>, classes: usize, lb: &Letterbox) -> Vec<Detection> {
        let mut dets = Vec::new();
        for anchor in 0..view.ncols() {
            // -------- best class ---------------
            let mut best_cls = None;
            let mut best_score = 0.0f32;
            for c in 0..classes {
                let score = view[[4 + c, anchor]];
                if score > best_score {
                    best_score = score;
                    best_cls = Some(c);
                }
            }
            let Some(cls) = best_cls else { continue };
            if !self.accepts_class(cls) || best_score < self.config.conf_threshold {
                continue;
            }

            // -------- centre + size → corners --
            let (cx, cy) = (view[[0, anchor]], view[[1, anchor]]);
            let (w, h) = (view[[2, anchor]], view[[3, anchor]]);
            let corners = [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0];

            if let Some(bbox) = self.to_frame_box(corners, lb) {
                dets.push(Detection::new(bbox, cls, best_score));
            }
        }
        dets
    }

    fn decode_box_conf_class(&self, view: ArrayView2<'_, f32>, lb: &Letterbox) -> Vec<Detection> {
        // some exports emit 0‑1 coordinates; detect that from the first rows
        let probe = view.nrows().min(NORMALISED_PROBE_ROWS);
        let max_coord = (0..probe)
            .map(|i| view[[i, 2]].max(view[[i, 3]]))
            .fold(0.0f32, f32::max);
        let norm = if max_coord <= 1.5 { self.config.input_size as f32 } else { 1.0 };

        let mut dets = Vec::new();
        for row in view.outer_iter() {
            let score = row[4];
            if score.is_nan() || row[5].is_nan() || score < self.config.conf_threshold || row[5] < 0.0 {
                continue;
            }
            let cls = row[5] as usize;
            if !self.accepts_class(cls) {
                continue;
            }
            let corners = [row[0] * norm, row[1] * norm, row[2] * norm, row[3] * norm];
            if let Some(bbox) = self.to_frame_box(corners, lb) {
                dets.push(Detection::new(bbox, cls, score));
            }
        }
        dets
    }

    /// Model-space corners → clamped integer frame box, or `None` if the
    /// result is below the size floor.
    fn to_frame_box(&self, [x1, y1, x2, y2]: [f32; 4], lb: &Letterbox) -> Option<BoxRect> {
        let (x1, y1) = lb.to_original_clamped(x1, y1);
        let (x2, y2) = lb.to_original_clamped(x2, y2);

        let w = (x2 - x1) as i32;
        let h = (y2 - y1) as i32;
        if w < self.config.min_box_px || h < self.config.min_box_px {
            return None;
        }
        Some(BoxRect::new(x1 as i32, y1 as i32, w, h))
    }
}
