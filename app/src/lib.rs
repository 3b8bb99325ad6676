// app/src/lib.rs
// ============================================================
// lanewatch  –  frame loop and wiring
// Connects a FrameSource, an Inference backend and the stage
// crates, and hands counted vehicles to a ViolationSink.
// ------------------------------------------------------------
// FrameSource → FramePipeline::process → ViolationSink
// ============================================================

pub mod config;
pub mod pipeline;
pub mod sink;
pub mod source;
#[cfg(feature = "tract")]
pub mod tract_backend;

pub use config::{ModelConfig, PipelineConfig};
pub use pipeline::{FramePipeline, FrameReport, RunSummary};
pub use sink::{JsonLinesSink, ViolationSink};
pub use source::{DirectorySource, Frame, FrameSource, MemorySource};
