pub mod dense;
pub mod lif;

use crate::error::{Error, Result};
use dense::DenseLayer;
use lif::LeakyLayer;

pub trait LayerOps: Send + Sync {
    /// writes this step's output into `output`, which must be exactly `out_width` long
    fn forward_into(&mut self, input: &[f32], output: &mut [f32]) -> Result<()>;

    /// how many values this layer consumes
    fn in_width(&self) -> usize;

    /// how many values this layer produces
    fn out_width(&self) -> usize;

    /// resets internal state fully
    fn reset(&mut self) {}

    fn forward(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let mut output = vec![0.0; self.out_width()];
        self.forward_into(input, &mut output)?;
        Ok(output)
    }
}

/// A single stage of a network. Only two kinds exist.
#[derive(Debug, Clone)]
pub enum Layer {
    Dense(DenseLayer),
    Leaky(LeakyLayer),
}

impl Layer {
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Dense(_) => "dense",
            Layer::Leaky(_) => "leaky",
        }
    }

    pub fn as_dense(&self) -> Option<&DenseLayer> {
        match self {
            Layer::Dense(d) => Some(d),
            Layer::Leaky(_) => None,
        }
    }

    pub fn as_leaky(&self) -> Option<&LeakyLayer> {
        match self {
            Layer::Leaky(l) => Some(l),
            Layer::Dense(_) => None,
        }
    }
}

impl LayerOps for Layer {
    fn forward_into(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        match self {
            Layer::Dense(d) => d.forward_into(input, output),
            Layer::Leaky(l) => l.forward_into(input, output),
        }
    }

    fn in_width(&self) -> usize {
        match self {
            Layer::Dense(d) => d.in_width(),
            Layer::Leaky(l) => l.in_width(),
        }
    }

    fn out_width(&self) -> usize {
        match self {
            Layer::Dense(d) => d.out_width(),
            Layer::Leaky(l) => l.out_width(),
        }
    }

    fn reset(&mut self) {
        match self {
            Layer::Dense(_) => {}
            Layer::Leaky(l) => l.reset(),
        }
    }
}

impl From<DenseLayer> for Layer {
    fn from(d: DenseLayer) -> Self {
        Layer::Dense(d)
    }
}

impl From<LeakyLayer> for Layer {
    fn from(l: LeakyLayer) -> Self {
        Layer::Leaky(l)
    }
}

/// Metadata about a layer, for logging and inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub index: usize,
    pub kind: &'static str,
    pub in_width: usize,
    pub out_width: usize,
}

/// Checks the lengths a layer is handed against its widths.
pub(crate) fn check_io(
    layer: &'static str,
    input: &[f32],
    output: &[f32],
    in_width: usize,
    out_width: usize,
) -> Result<()> {
    if input.len() != in_width {
        return Err(Error::shape(format!("{layer} input"), in_width, input.len()));
    }
    if output.len() != out_width {
        return Err(Error::shape(format!("{layer} output"), out_width, output.len()));
    }
    Ok(())
}

/// Allocates `len` floats without aborting on failure, filling each slot from `fill`.
pub(crate) fn try_alloc(len: usize, fill: impl FnMut() -> f32) -> Result<Vec<f32>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.extend(std::iter::repeat_with(fill).take(len));
    Ok(v)
}
