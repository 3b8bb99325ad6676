//! lanewatch‑preprocess – letterbox + normalize RGB frames.
//!
//! Every model in the pipeline consumes a square, letterboxed input.  This
//! crate owns that transform in both directions ([`Letterbox`]) and the
//! small amount of line geometry the later stages share ([`geometry`]).

use image::RgbImage;
use ndarray::Array4;
use resize::{new, Pixel, Type};
use rgb::FromSlice;
use thiserror::Error;

pub mod geometry;
mod letterbox;

pub use geometry::{clip_polyline, Line};
pub use letterbox::Letterbox;

/// Grey value used for the letterbox padding (same as the training pipeline).
pub const PAD_VALUE: u8 = 114;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Frame is empty ({0}x{1})")]
    EmptyFrame(u32, u32),
    #[error("Model input size must be positive")]
    ZeroInputSize,
    #[error("Letterbox scale must be finite and positive, got {0}")]
    InvalidScale(f32),
    #[error("Resize failed: {0}")]
    Resize(#[from] resize::Error),
}

pub type Result<T> = std::result::Result<T, PreprocessError>;

#[derive(Clone, Debug)]
pub struct Preprocessor {
    size: u32,
}

impl Preprocessor {
    /// Create a pre‑processor that outputs a `1×3×size×size` tensor (0‑1.0f32).
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn input_size(&self) -> u32 {
        self.size
    }

    /// Letterbox `frame` into the model input and return the NCHW tensor
    /// together with the transform needed to map results back.
    pub fn run(&self, frame: &RgbImage) -> Result<(Array4<f32>, Letterbox)> {
        let (w, h) = frame.dimensions();
        let lb = Letterbox::fit(w, h, self.size)?;

        // 1. Resize with aspect ratio preserved (bilinear, resize crate)
        let (new_w, new_h) = (lb.new_w as usize, lb.new_h as usize);
        let mut dst = vec![0u8; new_w * new_h * 3];
        let mut resizer = new(
            w as usize,
            h as usize,
            new_w,
            new_h,
            Pixel::RGB8,
            Type::Triangle,
        )?;
        resizer.resize(frame.as_raw().as_rgb(), dst.as_rgb_mut())?;

        // 2. Pad + normalize into (N,C,H,W)
        let s = self.size as usize;
        let mut tensor = Array4::<f32>::from_elem((1, 3, s, s), PAD_VALUE as f32 / 255.0);
        let (px, py) = (lb.pad_x as usize, lb.pad_y as usize);
        for y in 0..new_h {
            for x in 0..new_w {
                let base = (y * new_w + x) * 3;
                for c in 0..3 {
                    tensor[[0, c, py + y, px + x]] = dst[base + c] as f32 / 255.0;
                }
            }
        }

        log::trace!(
            "letterboxed {}x{} -> {}x{} (scale {:.4}, pad {},{})",
            w, h, new_w, new_h, lb.scale, lb.pad_x, lb.pad_y
        );
        Ok((tensor, lb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn empty_frame_is_rejected() {
        let pp = Preprocessor::new(640);
        let frame = RgbImage::new(0, 0);
        assert!(matches!(pp.run(&frame), Err(PreprocessError::EmptyFrame(0, 0))));
    }

    #[test]
    fn padding_rows_keep_the_pad_value() {
        let pp = Preprocessor::new(64);
        let frame = RgbImage::from_pixel(128, 64, Rgb([255, 255, 255]));
        let (tensor, lb) = pp.run(&frame).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!((lb.new_w, lb.new_h), (64, 32));
        assert_eq!(lb.pad_y, 16);

        let pad = PAD_VALUE as f32 / 255.0;
        assert!((tensor[[0, 0, 0, 10]] - pad).abs() < 1e-6);
        assert!((tensor[[0, 1, 63, 10]] - pad).abs() < 1e-6);
        assert!((tensor[[0, 2, 32, 32]] - 1.0).abs() < 1e-3);
    }
}
