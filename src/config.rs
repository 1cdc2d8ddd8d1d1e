use crate::error::Result;
use crate::layer::dense::parse_bias_flag;
use crate::model::Network;
use crate::rng::RandomSource;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One entry of the layer list, appended in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerConfig {
    Dense {
        out_width: usize,
        /// defaults to the width coming out of the previous layer
        #[serde(default)]
        in_width: Option<usize>,
        /// 0 or 1
        #[serde(default = "default_bias")]
        bias: i64,
    },
    Leaky {
        beta: f32,
        threshold: f32,
    },
}

fn default_bias() -> i64 {
    1
}

/// Everything the pipeline binary needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// fixed seed for reproducible runs, entropy when absent
    pub seed: Option<u64>,
    pub n_samples: usize,
    pub n_inputs: usize,
    pub n_steps: usize,
    /// independent re-encodings of fresh signals
    pub trials: usize,
    /// threads used for the forward pass, 1 runs on the caller's thread
    pub workers: usize,
    /// where to write the last trial's spikes, if anywhere
    pub spikes_csv: Option<PathBuf>,
    pub layers: Vec<LayerConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            n_samples: 10,
            n_inputs: 20,
            n_steps: 25,
            trials: 1,
            workers: 1,
            spikes_csv: None,
            layers: vec![
                LayerConfig::Dense {
                    out_width: 21,
                    in_width: None,
                    bias: 1,
                },
                LayerConfig::Leaky {
                    beta: 0.8,
                    threshold: 0.45,
                },
                LayerConfig::Dense {
                    out_width: 200,
                    in_width: None,
                    bias: 1,
                },
                LayerConfig::Leaky {
                    beta: 0.4,
                    threshold: 0.75,
                },
            ],
        }
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let cfg: Self = serde_json::from_reader(reader)?;
        info!("loaded config from {}", path.display());
        Ok(cfg)
    }

    /// Appends the configured layers in order.
    pub fn build_network<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<Network> {
        let mut net = Network::new();
        let mut width = self.n_inputs;
        for layer in &self.layers {
            match *layer {
                LayerConfig::Dense {
                    out_width,
                    in_width,
                    bias,
                } => {
                    let in_width = in_width.unwrap_or(width);
                    net.append_dense(in_width, out_width, parse_bias_flag(bias)?, rng)?;
                    width = out_width;
                }
                LayerConfig::Leaky { beta, threshold } => net.append_leaky(beta, threshold)?,
            }
        }
        Ok(net)
    }
}
