use ndarray::{Array4, ArrayD};

use crate::Result;

/// Output tensors of one inference call, keyed by the model's output names.
#[derive(Clone, Debug, Default)]
pub struct NamedTensors {
    outputs: Vec<(String, ArrayD<f32>)>,
}

impl NamedTensors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, tensor: ArrayD<f32>) {
        self.outputs.push((name.into(), tensor));
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// First output whose name contains `hint` (case-insensitive).
    pub fn find(&self, hint: &str) -> Option<&ArrayD<f32>> {
        let hint = hint.to_ascii_lowercase();
        self.outputs
            .iter()
            .find(|(name, _)| name.to_ascii_lowercase().contains(&hint))
            .map(|(_, t)| t)
    }

    /// Output at position `idx`, in model order.
    pub fn get(&self, idx: usize) -> Option<&ArrayD<f32>> {
        self.outputs.get(idx).map(|(_, t)| t)
    }
}

/// Opaque model runner: letterboxed NCHW input in, named raw tensors out.
pub trait Inference {
    fn run(&mut self, input: &Array4<f32>) -> Result<NamedTensors>;
}

impl<I: Inference + ?Sized> Inference for Box<I> {
    fn run(&mut self, input: &Array4<f32>) -> Result<NamedTensors> {
        (**self).run(input)
    }
}
