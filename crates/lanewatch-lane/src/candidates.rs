//! Pixel-driven boundary candidates: column histogram peaks per sample
//! band, stitched bottom-up into polylines and fitted with `x = m·y + b`.

use image::GrayImage;
use lanewatch_preprocess::Line;

const MAX_PEAKS: usize = 10;

pub(crate) struct CandidateParams {
    pub peak_min_gap: u32,
    pub follow_window: u32,
    pub band_count: usize,
}

/// Number of foreground pixels per column over rows `y0..y1`.
fn column_sums(mask: &GrayImage, y0: u32, y1: u32) -> Vec<u32> {
    let mut sums = vec![0u32; mask.width() as usize];
    for y in y0..y1 {
        for (x, s) in sums.iter_mut().enumerate() {
            if mask.get_pixel(x as u32, y)[0] > 0 {
                *s += 1;
            }
        }
    }
    sums
}

/// Drivable extent of a band histogram; the full width when the corridor
/// looks implausibly narrow.
fn corridor_from_hist(hist: &[u32], band_h: u32) -> (usize, usize) {
    let w = hist.len();
    let thr = (band_h / 20).max(3);
    let left = hist.iter().position(|&v| v >= thr);
    let right = hist.iter().rposition(|&v| v >= thr);
    match (left, right) {
        (Some(l), Some(r)) if (r as f64 - l as f64) >= w as f64 * 0.25 => (l, r),
        _ => (0, w.saturating_sub(1)),
    }
}

/// Local maxima of `hist` inside `[left, right]`, strongest first, at least
/// `min_distance` apart. Returned sorted by x.
pub(crate) fn find_peaks(hist: &[u32], left: usize, right: usize, min_distance: usize) -> Vec<usize> {
    if hist.is_empty() {
        return Vec::new();
    }
    let left = left.min(hist.len() - 1);
    let right = right.min(hist.len() - 1);
    if right <= left {
        return Vec::new();
    }

    let mut peaks: Vec<(usize, u32)> = (left + 1..right.saturating_sub(1))
        .filter(|&x| hist[x] > 0 && hist[x] >= hist[x - 1] && hist[x] >= hist[x + 1])
        .map(|x| (x, hist[x]))
        .collect();
    peaks.sort_by(|a, b| b.1.cmp(&a.1));

    let mut picked: Vec<usize> = Vec::new();
    for (x, _) in peaks {
        if picked.iter().any(|&q| q.abs_diff(x) < min_distance) {
            continue;
        }
        picked.push(x);
        if picked.len() >= MAX_PEAKS {
            break;
        }
    }
    picked.sort_unstable();
    picked
}

/// Stitch peak points into bottom-to-top polylines. Visiting points from
/// the bottom, each joins the group whose last point lies below it and is
/// closest in x within `follow_window`.
fn stitch(mut points: Vec<(i32, i32)>, follow_window: i32, min_len: usize) -> Vec<Vec<(i32, i32)>> {
    points.sort_by(|a, b| b.1.cmp(&a.1));

    let mut groups: Vec<Vec<(i32, i32)>> = Vec::new();
    for p in points {
        let mut best: Option<(usize, i32)> = None;
        for (gi, g) in groups.iter().enumerate() {
            let Some(&last) = g.last() else { continue };
            if p.1 >= last.1 {
                continue;
            }
            let dx = (p.0 - last.0).abs();
            if dx <= follow_window && best.map_or(true, |(_, b)| dx < b) {
                best = Some((gi, dx));
            }
        }
        match best {
            Some((gi, _)) => groups[gi].push(p),
            None => groups.push(vec![p]),
        }
    }

    groups.retain(|g| g.len() >= min_len);
    groups
}

/// Candidate polylines (ROI-local points) for a lane mask.
pub(crate) fn candidate_polylines(
    lane_mask: &GrayImage,
    drivable: Option<&GrayImage>,
    sample_ys: &[i32],
    params: &CandidateParams,
) -> Vec<Vec<(i32, i32)>> {
    let (w, h) = lane_mask.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let band_h = (h / 18).clamp(10, 28);
    let min_distance = params.peak_min_gap.max(10) as usize;

    let mut points = Vec::new();
    for &y in sample_ys {
        let y0 = (y - band_h as i32 / 2).clamp(0, h as i32 - 1) as u32;
        let y1 = (y0 + band_h).min(h);
        if y1 <= y0 + 1 {
            continue;
        }

        let hist = column_sums(lane_mask, y0, y1);
        let (left, right) = match drivable {
            Some(d) if d.dimensions() == (w, h) => corridor_from_hist(&column_sums(d, y0, y1), y1 - y0),
            _ => (0, w as usize - 1),
        };

        for x in find_peaks(&hist, left, right, min_distance) {
            points.push((x as i32, y));
        }
    }

    let follow = params.follow_window.max(25) as i32;
    let min_len = (params.band_count / 3).max(6);
    stitch(points, follow, min_len)
}

/// Fitted lines for the given polylines; degenerate ones are skipped.
pub(crate) fn fit_lines(polylines: &[Vec<(i32, i32)>]) -> Vec<Line> {
    polylines.iter().filter_map(|p| Line::fit(p)).collect()
}
