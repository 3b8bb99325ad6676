use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use lanewatch_detect::{Decoder, Detection, Inference, NamedTensors};
use lanewatch_lane::{LaneAnalyzer, LaneModel};
use lanewatch_preprocess::Preprocessor;
use lanewatch_segment::Postprocessor;
use lanewatch_track::{DirectionCounter, TrackManager, VehicleRecord};
use log::{debug, info};

use crate::config::{ModelConfig, PipelineConfig};
use crate::sink::ViolationSink;
use crate::source::{Frame, FrameSource};

/// What one frame produced.
#[derive(Debug)]
pub struct FrameReport {
    pub index: u64,
    pub detections: Vec<Detection>,
    /// Track id per detection, same order.
    pub track_ids: Vec<u64>,
    pub lanes: Option<LaneModel>,
    pub records: Vec<VehicleRecord>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub records: u64,
    pub violations: u64,
    pub stopped_early: bool,
}

/// decode → segment → lanes → tracks, one frame at a time.
pub struct FramePipeline<I> {
    engine: I,
    preprocessor: Preprocessor,
    decoder: Decoder,
    segmenter: Postprocessor,
    analyzer: LaneAnalyzer,
    tracks: TrackManager,
    counter: DirectionCounter,
    names: ModelConfig,
}

fn pick<'a>(outputs: &'a NamedTensors, hint: &str) -> Option<&'a ndarray::ArrayD<f32>> {
    if hint.is_empty() {
        None
    } else {
        outputs.find(hint)
    }
}

impl<I: Inference> FramePipeline<I> {
    pub fn new(engine: I, config: &PipelineConfig) -> Self {
        Self {
            engine,
            preprocessor: Preprocessor::new(config.decoder.input_size),
            decoder: Decoder::new(config.decoder.clone()),
            segmenter: Postprocessor::new(config.segment.clone()),
            analyzer: LaneAnalyzer::new(config.lanes.clone()),
            tracks: TrackManager::new(config.tracking.clone()),
            counter: DirectionCounter::new(&config.tracking),
            names: config.model.clone(),
        }
    }

    pub fn tracks(&self) -> &TrackManager {
        &self.tracks
    }

    /// `(left, forward, right)` vehicle counts so far.
    pub fn counts(&self) -> (u64, u64, u64) {
        self.counter.counts()
    }

    pub fn process(&mut self, frame: &Frame) -> Result<FrameReport> {
        let (w, h) = frame.image.dimensions();
        let (input, lb) = self.preprocessor.run(&frame.image)?;
        let outputs = self.engine.run(&input)?;

        let det = match pick(&outputs, &self.names.detection_output) {
            Some(t) => t,
            None => outputs.get(0).context("Model produced no outputs")?,
        };
        let detections = self.decoder.decode(det.view(), &lb)?;

        let lanes = match pick(&outputs, &self.names.lane_output) {
            Some(lane) => {
                let drive = pick(&outputs, &self.names.drivable_output);
                let seg = self.segmenter.process(drive.map(|d| d.view()), lane.view(), &lb)?;
                Some(self.analyzer.analyze(seg.lane_prob.view(), w, h, seg.drivable.as_ref())?)
            }
            None => None,
        };

        let track_ids = self.tracks.step(&detections, frame.timestamp_ms, lanes.as_ref())?;

        let mut records = Vec::new();
        for (id, dir) in self.counter.update(self.tracks.tracks(), w, h) {
            if let Some(t) = self.tracks.get(id) {
                records.push(VehicleRecord::from_track(t, dir, frame.timestamp_ms));
            }
        }

        debug!(
            "frame {}: {} detections, {} live tracks, {} counted",
            frame.index,
            detections.len(),
            self.tracks.len(),
            records.len()
        );
        Ok(FrameReport { index: frame.index, detections, track_ids, lanes, records })
    }

    /// Drain `source` into `sink`. `stop` is polled between frames.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn ViolationSink,
        stop: &AtomicBool,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        while let Some(frame) = source.next_frame()? {
            if stop.load(Ordering::SeqCst) {
                summary.stopped_early = true;
                break;
            }
            let report = self.process(&frame).with_context(|| format!("Frame {} failed", frame.index))?;
            for r in &report.records {
                sink.emit(r)?;
                summary.records += 1;
                if r.violation {
                    summary.violations += 1;
                }
            }
            summary.frames += 1;
        }
        sink.flush()?;

        let (l, f, r) = self.counts();
        info!(
            "{} frames, {} vehicles (L:{} F:{} R:{}), {} violations",
            summary.frames, summary.records, l, f, r, summary.violations
        );
        Ok(summary)
    }
}
