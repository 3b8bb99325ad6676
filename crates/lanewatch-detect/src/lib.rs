// lanewatch-detect/src/lib.rs
// ============================================================
// lanewatch-detect  –  vehicle detection stage
// Turns raw detector tensors into boxes in original-frame
// coordinates, then runs class-aware greedy NMS.
// ------------------------------------------------------------
// Pipeline: Array4<f32> → Inference → ArrayD<f32> → Vec<Detection>
// ------------------------------------------------------------
// Public API
//   * Decoder::decode(tensor, letterbox) – boxes after NMS
//   * Detector::detect(frame)            – full frame → detections
//   * Inference                          – opaque model runner
// ============================================================

//! lanewatch – detection layer
//!
//! The decoder supports the two output layouts we ship models for (see
//! [`TensorLayout`]).  Which one applies is chosen in configuration; the
//! layout is never inferred from the tensor.  Inference itself sits behind
//! the [`Inference`] trait so the pipeline does not care which runtime
//! produced the tensors.

use lanewatch_preprocess::PreprocessError;
use thiserror::Error;

mod decode;
mod detector;
mod inference;
pub mod nms;
mod types;

pub use decode::{Decoder, DecoderConfig, TensorLayout};
pub use detector::{Detector, YoloDetector};
pub use inference::{Inference, NamedTensors};
pub use nms::{iou, non_max_suppression};
pub use types::{BoxRect, Detection};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Invalid output shape for {layout}: got {shape:?}")]
    InvalidOutputShape { layout: &'static str, shape: Vec<usize> },
    #[error("Model produced no output matching '{0}'")]
    MissingOutput(String),
    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("Inference failed: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, DetectError>;
