use crate::error::{Error, Result};
use crate::layer::dense::DenseLayer;
use crate::layer::lif::LeakyLayer;
use crate::layer::{Layer, LayerInfo, LayerOps};
use crate::rng::RandomSource;
use candle_core::{DType, Tensor};
use log::{debug, trace};
use std::ops::Range;
use std::thread;

pub const INITIAL_CAPACITY: usize = 4;

/// Ordered stack of layers driven one timestep at a time.
///
/// Tensors are time-major: inputs are `[time, samples, inputs]` and outputs
/// `[time, samples, outputs]`. Layers are only ever appended or removed from
/// the end, and every leaky layer is reset before each sample.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
    /// ping-pong activations, sized to the widest layer on each forward call
    scratch: [Vec<f32>; 2],
}

/// Result of walking the layer chain for a given input width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainShape {
    pub output_width: usize,
    pub max_width: usize,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Self {
            layers: Vec::with_capacity(INITIAL_CAPACITY),
            scratch: [Vec::new(), Vec::new()],
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.layers.capacity()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn append_dense<R: RandomSource + ?Sized>(
        &mut self,
        in_width: usize,
        out_width: usize,
        use_bias: bool,
        rng: &mut R,
    ) -> Result<()> {
        let layer = DenseLayer::new(in_width, out_width, use_bias, rng)?;
        self.push(layer.into())
    }

    /// Appends a leaky layer as wide as the dense layer before it.
    pub fn append_leaky(&mut self, beta: f32, threshold: f32) -> Result<()> {
        let width = match self.layers.last() {
            None => return Err(Error::NoPrecedingLayer),
            Some(Layer::Dense(d)) => d.out_width(),
            Some(Layer::Leaky(_)) => {
                return Err(Error::PrecedingLayerNotDense {
                    index: self.layers.len() - 1,
                });
            }
        };
        let layer = LeakyLayer::new(width, beta, threshold)?;
        self.push(layer.into())
    }

    /// Appends an already built layer. Widths are checked on the next forward call.
    pub fn push(&mut self, layer: Layer) -> Result<()> {
        self.grow()?;
        self.layers.push(layer);
        Ok(())
    }

    /// Removes the last layer; `None` when there is nothing to remove.
    pub fn remove_last(&mut self) -> Option<Layer> {
        self.layers.pop()
    }

    /// Drops every layer. Calling it again is a no-op.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.scratch = [Vec::new(), Vec::new()];
    }

    /// Doubles the backing store when it is full.
    fn grow(&mut self) -> Result<()> {
        let capacity = self.layers.capacity();
        if self.layers.len() < capacity {
            return Ok(());
        }
        let additional = capacity.max(INITIAL_CAPACITY);
        self.layers.try_reserve_exact(additional)?;
        debug!(
            "network storage grown {} -> {}",
            capacity,
            self.layers.capacity()
        );
        Ok(())
    }

    /// Walks the chain once, checking each layer against the width flowing into it.
    pub fn check_shapes(&self, n_inputs: usize) -> Result<ChainShape> {
        if self.layers.is_empty() {
            return Err(Error::EmptyStack);
        }
        let mut expect_in = n_inputs;
        let mut max_width = n_inputs;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.in_width() != expect_in {
                return Err(Error::shape(
                    format!("layer {i} ({})", layer.kind()),
                    expect_in,
                    layer.in_width(),
                ));
            }
            expect_in = layer.out_width();
            max_width = max_width.max(expect_in);
        }
        debug!("shape walk: {n_inputs} -> {expect_in}, widest {max_width}");
        Ok(ChainShape {
            output_width: expect_in,
            max_width,
        })
    }

    pub fn output_width(&self, n_inputs: usize) -> Result<usize> {
        Ok(self.check_shapes(n_inputs)?.output_width)
    }

    pub fn summary(&self) -> Vec<LayerInfo> {
        self.layers
            .iter()
            .enumerate()
            .map(|(index, l)| LayerInfo {
                index,
                kind: l.kind(),
                in_width: l.in_width(),
                out_width: l.out_width(),
            })
            .collect()
    }

    /// Zeroes the membrane of every leaky layer.
    pub fn reset(&mut self) {
        reset_layers(&mut self.layers);
    }

    /// Runs `input` (`[n_steps, n_samples, n_inputs]`, time-major) through the
    /// network and returns `[n_steps, n_samples, outputs]`.
    pub fn forward_slice(
        &mut self,
        input: &[f32],
        n_steps: usize,
        n_samples: usize,
        n_inputs: usize,
    ) -> Result<Vec<f32>> {
        let shape = self.check_shapes(n_inputs)?;
        let dims = Dims::new(input, n_steps, n_samples, n_inputs)?;

        let n_out = shape.output_width;
        let mut output = vec![0.0; n_steps * n_samples * n_out];
        self.run_samples(input, 0..n_samples, dims, shape, &mut output, |_, s, t| {
            t * n_samples * n_out + s * n_out
        })?;
        Ok(output)
    }

    /// Tensor form of [`Network::forward_slice`]; the output lives on the input's device.
    pub fn forward_sequence(&mut self, spikes: &Tensor) -> Result<Tensor> {
        let (n_steps, n_samples, n_inputs) = spikes.dims3()?;
        let flat = spikes.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
        let n_out = self.output_width(n_inputs)?;
        let out = self.forward_slice(&flat, n_steps, n_samples, n_inputs)?;
        Ok(Tensor::from_vec(
            out,
            (n_steps, n_samples, n_out),
            spikes.device(),
        )?)
    }

    /// Same result as [`Network::forward_slice`], with samples spread over
    /// `workers` threads. Each worker runs its own copy of the network, so the
    /// membranes of `self` are left untouched.
    pub fn forward_parallel(
        &self,
        input: &[f32],
        n_steps: usize,
        n_samples: usize,
        n_inputs: usize,
        workers: usize,
    ) -> Result<Vec<f32>> {
        let shape = self.check_shapes(n_inputs)?;
        let dims = Dims::new(input, n_steps, n_samples, n_inputs)?;
        if n_steps == 0 || n_samples == 0 {
            return Ok(Vec::new());
        }

        let n_out = shape.output_width;
        let workers = workers.clamp(1, n_samples);
        let per_worker = n_samples.div_ceil(workers);
        debug!("forward over {n_samples} samples on {workers} workers");

        // each worker returns its samples as [sample][time][unit]
        let chunks: Vec<Result<Vec<f32>>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..n_samples)
                .step_by(per_worker)
                .map(|first| {
                    let samples = first..(first + per_worker).min(n_samples);
                    let mut net = self.clone();
                    scope.spawn(move || -> Result<Vec<f32>> {
                        let mut out = vec![0.0; samples.len() * n_steps * n_out];
                        net.run_samples(input, samples, dims, shape, &mut out, |k, _, t| {
                            (k * n_steps + t) * n_out
                        })?;
                        Ok(out)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or(Err(Error::WorkerPanicked)))
                .collect()
        });

        let mut output = vec![0.0; n_steps * n_samples * n_out];
        let mut s = 0;
        for chunk in chunks {
            for sample in chunk?.chunks_exact(n_steps * n_out) {
                for (t, row) in sample.chunks_exact(n_out).enumerate() {
                    let at = t * n_samples * n_out + s * n_out;
                    output[at..at + n_out].copy_from_slice(row);
                }
                s += 1;
            }
        }
        Ok(output)
    }

    /// Drives each sample of `samples` through every timestep, resetting the
    /// membranes first. `out_at(k, s, t)` places the output of the `k`-th
    /// sample handled here (sample `s` of the input) at step `t`.
    fn run_samples(
        &mut self,
        input: &[f32],
        samples: Range<usize>,
        dims: Dims,
        shape: ChainShape,
        output: &mut [f32],
        out_at: impl Fn(usize, usize, usize) -> usize,
    ) -> Result<()> {
        let Dims {
            n_steps,
            n_samples,
            n_inputs,
        } = dims;
        let n_out = shape.output_width;
        for buf in self.scratch.iter_mut() {
            buf.resize(shape.max_width, 0.0);
        }
        let [front, back] = &mut self.scratch;

        for (k, s) in samples.enumerate() {
            trace!("sample {s}");
            reset_layers(&mut self.layers);
            for t in 0..n_steps {
                let in_at = t * n_samples * n_inputs + s * n_inputs;
                let at = out_at(k, s, t);
                step(
                    &mut self.layers,
                    front,
                    back,
                    &input[in_at..in_at + n_inputs],
                    &mut output[at..at + n_out],
                )?;
            }
        }
        Ok(())
    }
}

/// Input dimensions of one forward call, checked against the input length.
#[derive(Debug, Clone, Copy)]
struct Dims {
    n_steps: usize,
    n_samples: usize,
    n_inputs: usize,
}

impl Dims {
    fn new(input: &[f32], n_steps: usize, n_samples: usize, n_inputs: usize) -> Result<Self> {
        let expected = n_steps * n_samples * n_inputs;
        if input.len() != expected {
            return Err(Error::shape("network input", expected, input.len()));
        }
        Ok(Self {
            n_steps,
            n_samples,
            n_inputs,
        })
    }
}

fn reset_layers(layers: &mut [Layer]) {
    for layer in layers.iter_mut() {
        layer.reset();
    }
}

/// One timestep of one sample through every layer.
fn step(
    layers: &mut [Layer],
    front: &mut [f32],
    back: &mut [f32],
    input: &[f32],
    output: &mut [f32],
) -> Result<()> {
    let mut width = input.len();
    front[..width].copy_from_slice(input);
    let (mut cur, mut next) = (front, back);
    for layer in layers.iter_mut() {
        let out_width = layer.out_width();
        layer.forward_into(&cur[..width], &mut next[..out_width])?;
        std::mem::swap(&mut cur, &mut next);
        width = out_width;
    }
    output.copy_from_slice(&cur[..width]);
    Ok(())
}
