//! Line and polyline helpers shared by the lane stages.
//!
//! Lines are parameterised by row: `x = m·y + b`, which keeps near-vertical
//! lane boundaries well conditioned.

/// `x = m·y + b`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub m: f64,
    pub b: f64,
}

impl Line {
    pub fn new(m: f64, b: f64) -> Self {
        Self { m, b }
    }

    /// Line through two points. `None` if both points share a row.
    pub fn through(p1: (f64, f64), p2: (f64, f64)) -> Option<Self> {
        let dy = p2.1 - p1.1;
        if dy.abs() < 1e-6 {
            return None;
        }
        let m = (p2.0 - p1.0) / dy;
        Some(Self { m, b: p1.0 - m * p1.1 })
    }

    pub fn x_at(&self, y: f64) -> f64 {
        self.m * y + self.b
    }

    /// Intersection point `(x, y)`; `None` for (near) parallel lines.
    pub fn intersect(&self, other: &Line) -> Option<(f64, f64)> {
        let den = self.m - other.m;
        if den.abs() < 1e-6 {
            return None;
        }
        let y = (other.b - self.b) / den;
        Some((self.x_at(y), y))
    }

    /// Least-squares fit of `x = m·y + b` over `points` given as `(x, y)`.
    pub fn fit(points: &[(i32, i32)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let (mut sy, mut sx, mut syy, mut syx) = (0.0, 0.0, 0.0, 0.0);
        for &(x, y) in points {
            let (x, y) = (x as f64, y as f64);
            sy += y;
            sx += x;
            syy += y * y;
            syx += y * x;
        }
        let denom = n * syy - sy * sy;
        if denom.abs() < 1e-6 {
            return None;
        }
        let m = (n * syx - sy * sx) / denom;
        Some(Self { m, b: (sx - m * sy) / n })
    }
}

/// Round and clamp a polyline into a `width×height` canvas, dropping
/// consecutive duplicates created by the clamp.
pub fn clip_polyline(points: &[(f64, f64)], width: u32, height: u32) -> Vec<(i32, i32)> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let (max_x, max_y) = ((width - 1) as f64, (height - 1) as f64);
    let mut out: Vec<(i32, i32)> = Vec::with_capacity(points.len());
    for &(x, y) in points {
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        let p = (x.clamp(0.0, max_x).round() as i32, y.clamp(0.0, max_y).round() as i32);
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    out
}
