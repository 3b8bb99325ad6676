// ------------------------------------------------------------
// helpers: IoU • class-aware greedy NMS
// ------------------------------------------------------------
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::{BoxRect, Detection};

const IOU_EPS: f32 = 1e-6;

/// Intersection over union of two integer rectangles.
pub fn iou(a: &BoxRect, b: &BoxRect) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = a.right().min(b.right());
    let y2 = a.bottom().min(b.bottom());

    let inter = (x2 - x1).max(0) as i64 * (y2 - y1).max(0) as i64;
    let union = a.area() + b.area() - inter;
    inter as f32 / (union as f32 + IOU_EPS)
}

/// Greedy NMS run independently per class id.
///
/// Within a class, the highest-scoring remaining box is kept and every box
/// overlapping it by more than `iou_thr` is dropped. Output is ordered by
/// ascending class id, then descending score.
pub fn non_max_suppression(dets: Vec<Detection>, iou_thr: f32) -> Vec<Detection> {
    let mut groups: BTreeMap<usize, Vec<Detection>> = BTreeMap::new();
    for d in dets {
        groups.entry(d.class_id).or_default().push(d);
    }

    let mut keep = Vec::new();
    for (_, mut group) in groups {
        // stable sort: equal scores keep decode order
        group.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        while !group.is_empty() {
            let best = group.remove(0);
            group.retain(|d| iou(&best.bbox, &d.bbox) <= iou_thr);
            keep.push(best);
        }
    }
    keep
}
