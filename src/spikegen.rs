use crate::error::Result;
use crate::rng::RandomSource;
use candle_core::{DType, Tensor};

/// Rate-encodes `analog` (`[n_samples, n_inputs]`, row-major) into
/// `[n_steps, n_samples, n_inputs]` spikes. Every element is redrawn each step
/// and fires with probability equal to its value clamped to [0, 1].
pub fn encode<R: RandomSource + ?Sized>(analog: &[f32], n_steps: usize, rng: &mut R) -> Vec<f32> {
    let mut out = Vec::with_capacity(n_steps * analog.len());
    for _ in 0..n_steps {
        out.extend(analog.iter().map(|&p| {
            if rng.uniform01() < p.clamp(0.0, 1.0) {
                1.0
            } else {
                0.0
            }
        }));
    }
    out
}

/// Tensor form of [`encode`]: `[samples, inputs]` in, `[time, samples, inputs]` out.
pub fn rate<R: RandomSource + ?Sized>(
    analog: &Tensor,
    n_steps: usize,
    rng: &mut R,
) -> Result<Tensor> {
    let (n_samples, n_inputs) = analog.dims2()?;
    let values = analog.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    let spikes = encode(&values, n_steps, rng);
    Ok(Tensor::from_vec(
        spikes,
        (n_steps, n_samples, n_inputs),
        analog.device(),
    )?)
}
