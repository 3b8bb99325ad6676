use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lanewatch_detect::DecoderConfig;
use lanewatch_lane::LaneConfig;
use lanewatch_segment::SegmentConfig;
use lanewatch_track::TrackConfig;
use serde::{Deserialize, Serialize};

/// Model file and the names of its outputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: Option<PathBuf>,
    /// Substring of the detection output name.
    pub detection_output: String,
    /// Substring of the drivable-area output name; empty disables it.
    pub drivable_output: String,
    /// Substring of the lane-line output name; empty disables lanes.
    pub lane_output: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            detection_output: "det".into(),
            drivable_output: "drive".into(),
            lane_output: "lane".into(),
        }
    }
}

/// Everything the pipeline can be tuned with, as one JSON document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub model: ModelConfig,
    pub decoder: DecoderConfig,
    pub segment: SegmentConfig,
    pub lanes: LaneConfig,
    pub tracking: TrackConfig,
    /// Frame rate used to timestamp sources without their own clock.
    pub fps: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            decoder: DecoderConfig::yolop(),
            segment: SegmentConfig::default(),
            lanes: LaneConfig::default(),
            tracking: TrackConfig::default(),
            fps: 30.0,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read config: {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse config: {:?}", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("Failed to write config: {:?}", path))
    }
}
