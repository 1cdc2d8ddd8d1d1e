use crate::error::Result;
use crate::rng::RandomSource;
use candle_core::{Device, Tensor};

/// Random analog inputs in [0, 1), one row per sample.
pub struct RandomSignals {
    inputs: Tensor,
}

impl RandomSignals {
    pub fn new<R: RandomSource + ?Sized>(
        n_samples: usize,
        n_inputs: usize,
        rng: &mut R,
        device: &Device,
    ) -> Result<Self> {
        let values: Vec<f32> = (0..n_samples * n_inputs).map(|_| rng.uniform01()).collect();
        Ok(Self {
            inputs: Tensor::from_vec(values, (n_samples, n_inputs), device)?,
        })
    }

    /// `[n_samples, n_inputs]`
    pub fn analog(&self) -> &Tensor {
        &self.inputs
    }
}
