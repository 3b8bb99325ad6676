use image::RgbImage;
use lanewatch_detect::{
    DecoderConfig, Decoder, DetectError, Detector, Inference, NamedTensors, TensorLayout, YoloDetector,
};
use ndarray::{Array3, Array4};

/// Fake backend returning a fixed YOLOv8-style tensor.
struct CannedModel {
    raw: Array3<f32>,
    calls: usize,
}

impl Inference for CannedModel {
    fn run(&mut self, input: &Array4<f32>) -> Result<NamedTensors, DetectError> {
        assert_eq!(input.shape(), &[1, 3, 320, 320]);
        self.calls += 1;
        let mut out = NamedTensors::new();
        out.push("output0", self.raw.clone().into_dyn());
        Ok(out)
    }
}

fn config() -> DecoderConfig {
    DecoderConfig {
        layout: TensorLayout::ClassScores { classes: 80, anchors: 16 },
        input_size: 320,
        ..DecoderConfig::yolov8()
    }
}

#[test]
fn blank_output_has_no_detections() -> anyhow::Result<()> {
    let model = CannedModel { raw: Array3::zeros((1, 84, 16)), calls: 0 };
    let mut det = YoloDetector::new(model, Decoder::new(config()));

    let frame = RgbImage::new(640, 480);
    assert!(det.detect(&frame)?.is_empty());
    Ok(())
}

#[test]
fn duplicate_anchors_collapse_to_one_truck() -> anyhow::Result<()> {
    let mut raw = Array3::<f32>::zeros((1, 84, 16));
    for (anchor, score) in [(0usize, 0.7f32), (1, 0.9), (2, 0.8)] {
        raw[[0, 0, anchor]] = 160.0 + anchor as f32;
        raw[[0, 1, anchor]] = 160.0;
        raw[[0, 2, anchor]] = 60.0;
        raw[[0, 3, anchor]] = 40.0;
        raw[[0, 4 + 7, anchor]] = score;
    }
    let model = CannedModel { raw, calls: 0 };
    let mut det = YoloDetector::new(model, Decoder::new(config())).with_output_hint("output");

    let dets = det.detect(&RgbImage::new(640, 480))?;
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].class_id, 7);
    assert!((dets[0].score - 0.9).abs() < 1e-6);
    assert_eq!(dets[0].label.as_deref(), Some("truck"));
    Ok(())
}

#[test]
fn empty_frame_is_an_invalid_argument() {
    let model = CannedModel { raw: Array3::zeros((1, 84, 16)), calls: 0 };
    let mut det = YoloDetector::new(model, Decoder::new(config()));
    let err = det.detect(&RgbImage::new(0, 0)).unwrap_err();
    assert!(matches!(err, DetectError::Preprocess(_)));
}

#[test]
fn decoder_config_round_trips_through_json() -> anyhow::Result<()> {
    let cfg = DecoderConfig::yolop();
    let json = serde_json::to_string(&cfg)?;
    let back: DecoderConfig = serde_json::from_str(&json)?;
    assert_eq!(cfg, back);
    Ok(())
}
