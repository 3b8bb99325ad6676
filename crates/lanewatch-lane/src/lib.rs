//! lanewatch‑lane – lane boundary geometry.
//!
//! [`LaneAnalyzer::analyze`] turns a lane probability map (frame resolution)
//! into a [`LaneModel`]: `TotalLanes + 1` boundary lines drawn through a
//! synthetic vanishing point above the ROI, spaced by an expected lane
//! width and anchored at the ego lane.  The model answers "which lane is
//! this point in" and knows how to draw itself.

use thiserror::Error;

mod analyzer;
mod candidates;
mod config;
mod draw;
mod model;

pub use analyzer::LaneAnalyzer;
pub use config::LaneConfig;
pub use draw::draw_boundaries;
pub use model::{LaneModel, Roi};

#[derive(Debug, Error)]
pub enum LaneError {
    #[error("Lane probability map is empty")]
    EmptyProbabilityMap,
    #[error("Invalid frame size {0}x{1}")]
    InvalidFrameSize(u32, u32),
    #[error("ROI too small: {0:?}")]
    RoiTooSmall(Roi),
    #[error(transparent)]
    Segment(#[from] lanewatch_segment::SegmentError),
}

pub type Result<T> = std::result::Result<T, LaneError>;
