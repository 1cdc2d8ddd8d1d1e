use crate::error::{Error, Result};
use crate::layer::{LayerOps, check_io, try_alloc};
use crate::rng::RandomSource;
use log::debug;

/// Fully connected projection `out = W·in + b`.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    in_width: usize,
    out_width: usize,
    /// row-major, `out_width` rows of `in_width`
    weights: Vec<f32>,
    /// present iff the layer was built with a bias
    bias: Option<Vec<f32>>,
}

/// Summary of a weight matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightStats {
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
    pub num_weights: usize,
}

/// Turns an integer bias flag into a bool; only 0 and 1 are accepted.
pub fn parse_bias_flag(flag: i64) -> Result<bool> {
    match flag {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::InvalidArgument(format!(
            "bias flag must be 0 or 1, got {other}"
        ))),
    }
}

impl DenseLayer {
    /// Builds a layer with every parameter drawn from U[-1/sqrt(in_width), 1/sqrt(in_width)).
    pub fn new<R: RandomSource + ?Sized>(
        in_width: usize,
        out_width: usize,
        has_bias: bool,
        rng: &mut R,
    ) -> Result<Self> {
        check_dims(in_width, out_width)?;

        let bound = 1.0 / (in_width as f32).sqrt();
        let weights = try_alloc(out_width * in_width, || rng.uniform_symmetric(bound))?;
        let bias = if has_bias {
            Some(try_alloc(out_width, || rng.uniform_symmetric(bound))?)
        } else {
            None
        };
        debug!("dense {in_width}->{out_width} (bias: {has_bias}), init bound {bound:.4}");

        Ok(Self {
            in_width,
            out_width,
            weights,
            bias,
        })
    }

    /// Builds a layer from explicit parameters.
    pub fn from_parameters(
        in_width: usize,
        out_width: usize,
        weights: Vec<f32>,
        bias: Option<Vec<f32>>,
    ) -> Result<Self> {
        check_dims(in_width, out_width)?;
        if weights.len() != out_width * in_width {
            return Err(Error::shape("dense weights", out_width * in_width, weights.len()));
        }
        if let Some(b) = &bias {
            if b.len() != out_width {
                return Err(Error::shape("dense bias", out_width, b.len()));
            }
        }
        Ok(Self {
            in_width,
            out_width,
            weights,
            bias,
        })
    }

    pub fn has_bias(&self) -> bool {
        self.bias.is_some()
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn bias(&self) -> Option<&[f32]> {
        self.bias.as_deref()
    }

    /// Stateless forward, allocating the output.
    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>> {
        let mut output = vec![0.0; self.out_width];
        self.project(input, &mut output)?;
        Ok(output)
    }

    fn project(&self, input: &[f32], output: &mut [f32]) -> Result<()> {
        check_io("dense", input, output, self.in_width, self.out_width)?;
        for (o, (row, out)) in self
            .weights
            .chunks_exact(self.in_width)
            .zip(output.iter_mut())
            .enumerate()
        {
            let dot: f32 = row.iter().zip(input).map(|(w, x)| w * x).sum();
            *out = match &self.bias {
                Some(b) => dot + b[o],
                None => dot,
            };
        }
        Ok(())
    }

    pub fn weight_stats(&self) -> WeightStats {
        let num_weights = self.weights.len();
        let sum: f32 = self.weights.iter().sum();
        let mean = sum / num_weights as f32;

        let variance: f32 = self
            .weights
            .iter()
            .map(|&w| (w - mean).powi(2))
            .sum::<f32>()
            / num_weights as f32;

        let min = self.weights.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = self
            .weights
            .iter()
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max);

        WeightStats {
            mean,
            std: variance.sqrt(),
            min,
            max,
            num_weights,
        }
    }
}

impl LayerOps for DenseLayer {
    fn forward_into(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        self.project(input, output)
    }

    fn in_width(&self) -> usize {
        self.in_width
    }

    fn out_width(&self) -> usize {
        self.out_width
    }
}

fn check_dims(in_width: usize, out_width: usize) -> Result<()> {
    if in_width == 0 || out_width == 0 {
        return Err(Error::InvalidDimensions {
            layer: "dense",
            in_width,
            out_width,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    fn close(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= 1e-5 * (1.0 + y.abs()))
    }

    #[test]
    fn parameter_counts_match_widths() {
        let mut rng = seeded(1);
        for (i, o) in [(1, 1), (4, 3), (20, 21), (21, 200)] {
            let with = DenseLayer::new(i, o, true, &mut rng).unwrap();
            assert_eq!(with.weights().len(), i * o);
            assert_eq!(with.bias().map(<[f32]>::len), Some(o));

            let without = DenseLayer::new(i, o, false, &mut rng).unwrap();
            assert_eq!(without.weights().len(), i * o);
            assert!(without.bias().is_none());
        }
    }

    #[test]
    fn init_is_bounded_by_fan_in() {
        let mut rng = seeded(2);
        let layer = DenseLayer::new(16, 32, true, &mut rng).unwrap();
        let bound = 0.25;
        for &w in layer.weights().iter().chain(layer.bias().unwrap()) {
            assert!(w >= -bound && w < bound);
        }
    }

    #[test]
    fn zero_width_is_rejected() {
        let mut rng = seeded(3);
        assert!(matches!(
            DenseLayer::new(0, 3, true, &mut rng),
            Err(Error::InvalidDimensions { in_width: 0, .. })
        ));
        assert!(matches!(
            DenseLayer::new(3, 0, false, &mut rng),
            Err(Error::InvalidDimensions { out_width: 0, .. })
        ));
    }

    #[test]
    fn bias_flag_must_be_binary() {
        assert!(!parse_bias_flag(0).unwrap());
        assert!(parse_bias_flag(1).unwrap());
        assert!(matches!(parse_bias_flag(2), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_bias_flag(-1), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn forward_computes_affine_map() {
        let layer = DenseLayer::from_parameters(
            2,
            3,
            vec![1.0, 2.0, 0.0, -1.0, 0.5, 0.5],
            Some(vec![0.0, 1.0, -1.0]),
        )
        .unwrap();
        let y = layer.forward(&[2.0, 4.0]).unwrap();
        assert_eq!(y, vec![10.0, -3.0, 2.0]);
    }

    #[test]
    fn forward_is_linear_without_bias() {
        let mut rng = seeded(4);
        let layer = DenseLayer::new(5, 4, false, &mut rng).unwrap();
        let x = [0.3, -1.2, 2.0, 0.0, 0.7];
        let y = [1.0, 0.5, -0.25, 3.0, -2.0];
        let a = 2.5;

        let fx = layer.forward(&x).unwrap();
        let fy = layer.forward(&y).unwrap();

        let ax: Vec<f32> = x.iter().map(|v| a * v).collect();
        let a_fx: Vec<f32> = fx.iter().map(|v| a * v).collect();
        assert!(close(&layer.forward(&ax).unwrap(), &a_fx));

        let xy: Vec<f32> = x.iter().zip(&y).map(|(p, q)| p + q).collect();
        let fx_fy: Vec<f32> = fx.iter().zip(&fy).map(|(p, q)| p + q).collect();
        assert!(close(&layer.forward(&xy).unwrap(), &fx_fy));
    }

    #[test]
    fn forward_rejects_wrong_input_width() {
        let mut rng = seeded(5);
        let layer = DenseLayer::new(4, 3, true, &mut rng).unwrap();
        assert!(matches!(
            layer.forward(&[1.0, 2.0]),
            Err(Error::ShapeMismatch {
                expected: 4,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn explicit_parameters_are_size_checked() {
        assert!(DenseLayer::from_parameters(2, 2, vec![0.0; 3], None).is_err());
        assert!(DenseLayer::from_parameters(2, 2, vec![0.0; 4], Some(vec![0.0])).is_err());
    }

    #[test]
    fn weight_stats_summarise_matrix() {
        let layer =
            DenseLayer::from_parameters(2, 2, vec![-1.0, 1.0, -1.0, 1.0], None).unwrap();
        let stats = layer.weight_stats();
        assert_eq!(stats.num_weights, 4);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std, 1.0);
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 1.0);
    }
}
