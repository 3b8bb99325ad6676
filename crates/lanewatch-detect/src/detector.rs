use image::RgbImage;
use lanewatch_preprocess::Preprocessor;

use crate::{DetectError, Decoder, Detection, Inference, Result};

/// Trait for object detectors.
pub trait Detector {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>>;
}

/// Letterbox → any [`Inference`] backend → [`Decoder`].
pub struct YoloDetector<I> {
    preprocessor: Preprocessor,
    engine: I,
    decoder: Decoder,
    /// Substring of the detection output's name; `None` takes output 0.
    output_hint: Option<String>,
}

impl<I: Inference> YoloDetector<I> {
    pub fn new(engine: I, decoder: Decoder) -> Self {
        Self {
            preprocessor: Preprocessor::new(decoder.config().input_size),
            engine,
            decoder,
            output_hint: None,
        }
    }

    /// Select the detection tensor by name when the model has several outputs.
    pub fn with_output_hint(mut self, hint: impl Into<String>) -> Self {
        self.output_hint = Some(hint.into());
        self
    }
}

impl<I: Inference> Detector for YoloDetector<I> {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let (input, lb) = self.preprocessor.run(frame)?;
        let outputs = self.engine.run(&input)?;

        let raw = match &self.output_hint {
            Some(hint) => outputs.find(hint),
            None => outputs.get(0),
        }
        .ok_or_else(|| DetectError::MissingOutput(self.output_hint.clone().unwrap_or_else(|| "#0".into())))?;

        self.decoder.decode(raw.view(), &lb)
    }
}
