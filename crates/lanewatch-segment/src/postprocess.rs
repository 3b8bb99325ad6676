use image::GrayImage;
use lanewatch_preprocess::Letterbox;
use ndarray::{Array2, ArrayViewD};
use serde::{Deserialize, Serialize};

use crate::mask::{cut_top, mask_from_probability, probability_map};
use crate::morph::{gate_by_drivable, open_close, remove_small_components};
use crate::unletterbox::{unletterbox_mask, unletterbox_prob};
use crate::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    pub drivable_threshold: f32,
    pub drivable_top_cut: f32,
    pub lane_threshold: f32,
    /// Fraction of rows zeroed at the top of the lane mask.
    pub lane_top_cut: f32,
    /// Disk radius the drivable mask is grown by before gating lanes.
    pub gate_dilate_radius: u8,
    pub lane_open_kernel: u32,
    pub lane_close_kernel: u32,
    pub min_component_area: u32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            drivable_threshold: 0.5,
            drivable_top_cut: 0.0,
            lane_threshold: 0.5,
            lane_top_cut: 0.35,
            gate_dilate_radius: 7,
            lane_open_kernel: 3,
            lane_close_kernel: 5,
            min_component_area: 500,
        }
    }
}

/// Masks for one frame at original-frame resolution.
#[derive(Clone, Debug)]
pub struct SegmentationOutput {
    pub drivable: Option<GrayImage>,
    pub lane: GrayImage,
    /// Lane probability, zero wherever the refined lane mask is empty.
    pub lane_prob: Array2<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct Postprocessor {
    config: SegmentConfig,
}

impl Postprocessor {
    pub fn new(config: SegmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Drivable-area logits → model-space mask.
    pub fn drivable_mask(&self, logits: ArrayViewD<'_, f32>) -> Result<GrayImage> {
        let prob = probability_map(logits)?;
        let mut mask = mask_from_probability(&prob, self.config.drivable_threshold);
        cut_top(&mut mask, self.config.drivable_top_cut);
        Ok(mask)
    }

    /// Lane logits → refined model-space mask plus the raw probability map.
    pub fn lane_mask(
        &self,
        logits: ArrayViewD<'_, f32>,
        drivable: Option<&GrayImage>,
    ) -> Result<(GrayImage, Array2<f32>)> {
        let cfg = &self.config;
        let prob = probability_map(logits)?;

        let mut mask = mask_from_probability(&prob, cfg.lane_threshold);
        cut_top(&mut mask, cfg.lane_top_cut);
        if let Some(road) = drivable {
            mask = gate_by_drivable(&mask, road, cfg.gate_dilate_radius)?;
        }
        let mask = open_close(&mask, cfg.lane_open_kernel, cfg.lane_close_kernel);
        let mask = remove_small_components(&mask, cfg.min_component_area);
        Ok((mask, prob))
    }

    /// Full post-processing for one frame, ending in original-frame space.
    pub fn process(
        &self,
        drive_logits: Option<ArrayViewD<'_, f32>>,
        lane_logits: ArrayViewD<'_, f32>,
        lb: &Letterbox,
    ) -> Result<SegmentationOutput> {
        let drivable = drive_logits.map(|t| self.drivable_mask(t)).transpose()?;
        let (lane, mut prob) = self.lane_mask(lane_logits, drivable.as_ref())?;

        for ((y, x), p) in prob.indexed_iter_mut() {
            if lane.get_pixel(x as u32, y as u32)[0] == 0 {
                *p = 0.0;
            }
        }

        let out = SegmentationOutput {
            drivable: drivable.as_ref().map(|d| unletterbox_mask(d, lb)).transpose()?,
            lane: unletterbox_mask(&lane, lb)?,
            lane_prob: unletterbox_prob(&prob, lb)?,
        };
        log::debug!(
            "segmentation: lane fg {} px, drivable {}",
            out.lane.pixels().filter(|p| p[0] > 0).count(),
            if out.drivable.is_some() { "present" } else { "absent" }
        );
        Ok(out)
    }
}
