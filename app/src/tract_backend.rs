use std::path::Path;

use anyhow::{Context, Result};
use lanewatch_detect::{DetectError, Inference, NamedTensors};
use ndarray::{Array4, ArrayD, IxDyn};
use tract_onnx::prelude::*;

/// ONNX model run through tract, fixed to a square `size×size` input.
pub struct TractInference {
    plan: TypedRunnableModel<TypedModel>,
    output_names: Vec<String>,
    size: usize,
}

impl TractInference {
    pub fn load(path: &Path, size: u32) -> Result<Self> {
        let size = size as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("Failed to load ONNX model: {:?}", path))?
            .with_input_fact(0, f32::fact([1, 3, size, size]).into())
            .context("Failed to set input fact")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to build runnable model")?;

        let model = plan.model();
        let output_names = model
            .output_outlets()?
            .iter()
            .map(|o| {
                model
                    .outlet_label(*o)
                    .map(str::to_string)
                    .unwrap_or_else(|| model.node(o.node).name.clone())
            })
            .collect::<Vec<_>>();
        log::info!("loaded {:?}, outputs {:?}", path, output_names);

        Ok(Self { plan, output_names, size })
    }
}

fn inference_err(e: impl std::fmt::Display) -> DetectError {
    DetectError::Inference(e.to_string())
}

impl Inference for TractInference {
    fn run(&mut self, input: &Array4<f32>) -> lanewatch_detect::Result<NamedTensors> {
        let shape = [1, 3, self.size, self.size];
        if input.shape() != &shape[..] {
            return Err(inference_err(format!("input shape {:?}, model wants {:?}", input.shape(), shape)));
        }
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_shape(&shape, &data).map_err(inference_err)?;

        let outputs = self.plan.run(tvec!(tensor.into())).map_err(inference_err)?;

        let mut named = NamedTensors::new();
        for (i, out) in outputs.iter().enumerate() {
            let view = out.to_array_view::<f32>().map_err(inference_err)?;
            let dims = view.shape().to_vec();
            let values: Vec<f32> = view.iter().copied().collect();
            let array = ArrayD::from_shape_vec(IxDyn(&dims), values).map_err(inference_err)?;
            let name = self.output_names.get(i).cloned().unwrap_or_else(|| format!("output_{i}"));
            named.push(name, array);
        }
        Ok(named)
    }
}
