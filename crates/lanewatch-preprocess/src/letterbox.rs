use crate::{PreprocessError, Result};

/// Resize-with-padding transform between an original frame and the square
/// model input.
///
/// Model space is `size×size`; the resized frame occupies
/// `[pad_x, pad_x + new_w) × [pad_y, pad_y + new_h)` and everything else is
/// padding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: i32,
    pub pad_y: i32,
    pub new_w: u32,
    pub new_h: u32,
    pub orig_w: u32,
    pub orig_h: u32,
    pub size: u32,
}

impl Letterbox {
    /// Compute the letterbox for an `orig_w×orig_h` frame into a `size×size` input.
    pub fn fit(orig_w: u32, orig_h: u32, size: u32) -> Result<Self> {
        if orig_w == 0 || orig_h == 0 {
            return Err(PreprocessError::EmptyFrame(orig_w, orig_h));
        }
        if size == 0 {
            return Err(PreprocessError::ZeroInputSize);
        }

        let scale = (size as f32 / orig_w as f32).min(size as f32 / orig_h as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, size);
        let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, size);

        Ok(Self {
            scale,
            pad_x: ((size - new_w) / 2) as i32,
            pad_y: ((size - new_h) / 2) as i32,
            new_w,
            new_h,
            orig_w,
            orig_h,
            size,
        })
    }

    /// Rebuild a letterbox from externally supplied `scale` / pad offsets.
    ///
    /// The scale must be finite and positive; pads may be anything, the
    /// valid rectangle is clipped to the input either way.
    pub fn from_parts(
        orig_w: u32,
        orig_h: u32,
        size: u32,
        scale: f32,
        pad_x: i32,
        pad_y: i32,
    ) -> Result<Self> {
        if orig_w == 0 || orig_h == 0 {
            return Err(PreprocessError::EmptyFrame(orig_w, orig_h));
        }
        if size == 0 {
            return Err(PreprocessError::ZeroInputSize);
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(PreprocessError::InvalidScale(scale));
        }
        Ok(Self {
            scale,
            pad_x,
            pad_y,
            new_w: ((orig_w as f32 * scale).round() as u32).clamp(1, size),
            new_h: ((orig_h as f32 * scale).round() as u32).clamp(1, size),
            orig_w,
            orig_h,
            size,
        })
    }

    /// Original frame → model space.
    pub fn to_model(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.scale + self.pad_x as f32,
            y * self.scale + self.pad_y as f32,
        )
    }

    /// Model space → original frame (unclamped).
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }

    /// Model space → original frame, clamped to `[0, dim-1]`.
    pub fn to_original_clamped(&self, x: f32, y: f32) -> (f32, f32) {
        let (ox, oy) = self.to_original(x, y);
        (
            ox.clamp(0.0, (self.orig_w - 1) as f32),
            oy.clamp(0.0, (self.orig_h - 1) as f32),
        )
    }

    /// Non-padded sub-rectangle of model space as `(x, y, w, h)`, intersected
    /// with the `size×size` input.
    pub fn valid_rect(&self) -> (u32, u32, u32, u32) {
        let size = self.size as i64;
        let x0 = (self.pad_x as i64).clamp(0, size);
        let y0 = (self.pad_y as i64).clamp(0, size);
        let x1 = (self.pad_x as i64 + self.new_w as i64).clamp(0, size);
        let y1 = (self.pad_y as i64 + self.new_h as i64).clamp(0, size);
        (x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_frame_is_padded_vertically() {
        let lb = Letterbox::fit(1280, 720, 640).unwrap();
        assert!((lb.scale - 0.5).abs() < 1e-6);
        assert_eq!((lb.new_w, lb.new_h), (640, 360));
        assert_eq!((lb.pad_x, lb.pad_y), (0, 140));
        assert_eq!(lb.valid_rect(), (0, 140, 640, 360));
    }

    #[test]
    fn portrait_frame_is_padded_horizontally() {
        let lb = Letterbox::fit(480, 640, 640).unwrap();
        assert_eq!((lb.new_w, lb.new_h), (480, 640));
        assert_eq!((lb.pad_x, lb.pad_y), (80, 0));
    }

    #[test]
    fn round_trip_stays_within_one_pixel() {
        let frames = [(1920, 1080), (640, 480), (333, 777), (1000, 1000), (17, 901)];
        for &(w, h) in &frames {
            for &size in &[320u32, 416, 640] {
                let lb = Letterbox::fit(w, h, size).unwrap();
                for &(x, y) in &[(0.0, 0.0), (w as f32 - 1.0, h as f32 - 1.0), (w as f32 / 3.0, h as f32 / 2.0)] {
                    let (mx, my) = lb.to_model(x, y);
                    let (ox, oy) = lb.to_original(mx, my);
                    assert!((ox - x).abs() <= 1.0, "x {x} -> {ox} for {w}x{h}@{size}");
                    assert!((oy - y).abs() <= 1.0, "y {y} -> {oy} for {w}x{h}@{size}");
                }
            }
        }
    }

    #[test]
    fn clamped_inverse_stays_inside_the_frame() {
        let lb = Letterbox::fit(1280, 720, 640).unwrap();
        assert_eq!(lb.to_original_clamped(-50.0, 10.0), (0.0, 0.0));
        assert_eq!(lb.to_original_clamped(700.0, 700.0), (1279.0, 719.0));
    }

    #[test]
    fn zero_sized_frame_is_an_error() {
        assert!(Letterbox::fit(0, 480, 640).is_err());
        assert!(Letterbox::fit(640, 480, 0).is_err());
    }

    #[test]
    fn parts_rebuild_the_fitted_transform() {
        let fitted = Letterbox::fit(1280, 720, 640).unwrap();
        let rebuilt = Letterbox::from_parts(1280, 720, 640, 0.5, 0, 140).unwrap();
        assert_eq!(rebuilt, fitted);
        assert_eq!(rebuilt.to_original(320.0, 320.0), (640.0, 360.0));
    }

    #[test]
    fn degenerate_scale_is_rejected() {
        for scale in [0.0, -0.5, f32::NAN, f32::INFINITY] {
            let res = Letterbox::from_parts(1280, 720, 640, scale, 0, 140);
            assert!(matches!(res, Err(PreprocessError::InvalidScale(_))), "scale {scale}");
        }
    }
}
