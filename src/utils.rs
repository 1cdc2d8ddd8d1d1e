use crate::error::Result;
use candle_core::{DType, Tensor};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct SpikeRecord {
    step: usize,
    sample: usize,
    unit: usize,
}

/// Mean firing rate over time, `[time, samples, units]` -> `[samples, units]`.
pub fn firing_rates(spikes: &Tensor) -> Result<Tensor> {
    Ok(spikes.to_dtype(DType::F32)?.mean(0)?)
}

/// Writes one `step,sample,unit` row per spike of a `[time, samples, units]` tensor.
pub fn save_spikes_csv(path: impl AsRef<Path>, spikes: &Tensor) -> Result<usize> {
    let (_, n_samples, n_units) = spikes.dims3()?;
    let flat = spikes.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    let mut w = csv::Writer::from_path(path)?;
    let mut count = 0;
    for (i, _) in flat.iter().enumerate().filter(|(_, v)| **v != 0.0) {
        w.serialize(SpikeRecord {
            step: i / (n_samples * n_units),
            sample: (i / n_units) % n_samples,
            unit: i % n_units,
        })?;
        count += 1;
    }
    w.flush()?;
    Ok(count)
}
