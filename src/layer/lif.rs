use crate::error::{Error, Result};
use crate::layer::{LayerOps, check_io, try_alloc};
use log::warn;

pub const DEFAULT_BETA: f32 = 0.5;
pub const DEFAULT_THRESHOLD: f32 = 1.0;

/// Leaky integrate-and-fire neurons with reset by subtraction.
#[derive(Debug, Clone)]
pub struct LeakyLayer {
    /// membrane potential
    membrane: Vec<f32>,
    /// membrane decay per step, in (0, 1)
    beta: f32,
    /// firing threshold, > 0
    threshold: f32,
    width: usize,
}

impl LeakyLayer {
    /// Out-of-range `beta` or `threshold` fall back to 0.5 and 1.0 with a warning.
    pub fn new(width: usize, beta: f32, threshold: f32) -> Result<Self> {
        if width == 0 {
            return Err(Error::InvalidDimensions {
                layer: "leaky",
                in_width: width,
                out_width: width,
            });
        }

        let threshold = if threshold > 0.0 {
            threshold
        } else {
            warn!("leaky: threshold must be > 0 (got {threshold}), using {DEFAULT_THRESHOLD}");
            DEFAULT_THRESHOLD
        };
        let beta = if beta > 0.0 && beta < 1.0 {
            beta
        } else {
            warn!("leaky: beta must be in (0, 1) (got {beta}), using {DEFAULT_BETA}");
            DEFAULT_BETA
        };

        Ok(Self {
            membrane: try_alloc(width, || 0.0)?,
            beta,
            threshold,
            width,
        })
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn membrane(&self) -> &[f32] {
        &self.membrane
    }
}

impl LayerOps for LeakyLayer {
    fn forward_into(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        check_io("leaky", input, output, self.width, self.width)?;
        let cells = self.membrane.iter_mut().zip(input).zip(output.iter_mut());
        for ((mem, &current), spike) in cells {
            let v = self.beta * *mem + current;
            // spikes where state > thresh
            if v > self.threshold {
                *mem = v - self.threshold;
                *spike = 1.0;
            } else {
                *mem = v;
                *spike = 0.0;
            }
        }
        Ok(())
    }

    fn in_width(&self) -> usize {
        self.width
    }

    fn out_width(&self) -> usize {
        self.width
    }

    fn reset(&mut self) {
        self.membrane.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RandomSource, seeded};

    #[test]
    fn constant_drive_trace() {
        let mut lif = LeakyLayer::new(1, 0.5, 1.0).unwrap();

        assert_eq!(lif.forward(&[2.0]).unwrap(), vec![1.0]);
        assert_eq!(lif.membrane(), &[1.0]);

        assert_eq!(lif.forward(&[2.0]).unwrap(), vec![1.0]);
        assert_eq!(lif.membrane(), &[1.5]);
    }

    #[test]
    fn subthreshold_input_accumulates_without_firing() {
        let mut lif = LeakyLayer::new(1, 0.5, 1.0).unwrap();
        assert_eq!(lif.forward(&[0.6]).unwrap(), vec![0.0]);
        assert_eq!(lif.membrane(), &[0.6]);
        // 0.5 * 0.6 + 0.6 = 0.9, still not above threshold
        assert_eq!(lif.forward(&[0.6]).unwrap(), vec![0.0]);
        assert!((lif.membrane()[0] - 0.9).abs() < 1e-6);
        // equal to threshold does not fire
        let mut lif = LeakyLayer::new(1, 0.5, 1.0).unwrap();
        assert_eq!(lif.forward(&[1.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn output_is_always_binary() {
        let mut rng = seeded(9);
        let mut lif = LeakyLayer::new(64, 0.9, 0.3).unwrap();
        for _ in 0..200 {
            let input: Vec<f32> = (0..64).map(|_| rng.uniform_symmetric(5.0)).collect();
            for s in lif.forward(&input).unwrap() {
                assert!(s == 0.0 || s == 1.0, "non-binary output {s}");
            }
        }
    }

    #[test]
    fn reset_zeroes_membrane() {
        let mut lif = LeakyLayer::new(3, 0.8, 0.45).unwrap();
        lif.forward(&[0.2, 3.0, -1.0]).unwrap();
        lif.forward(&[0.4, 0.1, -2.0]).unwrap();
        assert!(lif.membrane().iter().any(|&m| m != 0.0));
        lif.reset();
        assert_eq!(lif.membrane(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_range_parameters_fall_back() {
        let lif = LeakyLayer::new(2, 1.5, -0.1).unwrap();
        assert_eq!(lif.beta(), DEFAULT_BETA);
        assert_eq!(lif.threshold(), DEFAULT_THRESHOLD);

        let lif = LeakyLayer::new(2, 0.0, f32::NAN).unwrap();
        assert_eq!(lif.beta(), DEFAULT_BETA);
        assert_eq!(lif.threshold(), DEFAULT_THRESHOLD);

        let lif = LeakyLayer::new(2, 0.8, 0.45).unwrap();
        assert_eq!(lif.beta(), 0.8);
        assert_eq!(lif.threshold(), 0.45);
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(matches!(
            LeakyLayer::new(0, 0.5, 1.0),
            Err(Error::InvalidDimensions { layer: "leaky", .. })
        ));
    }

    #[test]
    fn wrong_input_width_is_rejected() {
        let mut lif = LeakyLayer::new(3, 0.5, 1.0).unwrap();
        assert!(matches!(
            lif.forward(&[1.0; 4]),
            Err(Error::ShapeMismatch {
                expected: 3,
                actual: 4,
                ..
            })
        ));
    }
}
