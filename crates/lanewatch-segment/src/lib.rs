//! lanewatch‑segment – segmentation logits → binary masks.
//!
//! Two-class logits (`[1, 2, H, W]`) from the segmentation heads become
//! 0/255 [`GrayImage`](image::GrayImage) masks in model space, are cleaned
//! up, and are finally mapped back to the original frame.

use thiserror::Error;

mod mask;
pub mod morph;
mod postprocess;
mod unletterbox;

pub use mask::{cut_top, mask_from_logits, mask_from_probability, probability_map};
pub use postprocess::{Postprocessor, SegmentConfig, SegmentationOutput};
pub use unletterbox::{unletterbox_mask, unletterbox_prob};

/// Foreground value of every binary mask produced here.
pub const FOREGROUND: u8 = 255;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Invalid segmentation tensor shape: expected [1, 2, H, W], got {0:?}")]
    InvalidShape(Vec<usize>),
    #[error("Mask is {got:?} but {expected:?} was expected")]
    SizeMismatch { expected: (u32, u32), got: (u32, u32) },
}

pub type Result<T> = std::result::Result<T, SegmentError>;
