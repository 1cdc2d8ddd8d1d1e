//! Time-stepped simulation of feed-forward spiking networks: dense projections
//! interleaved with leaky integrate-and-fire layers, driven by rate-encoded
//! spike trains.

pub mod config;
pub mod dataset;
pub mod error;
pub mod layer;
pub mod model;
pub mod rng;
pub mod spikegen;
pub mod utils;

pub use error::{Error, Result};
pub use layer::dense::{DenseLayer, WeightStats};
pub use layer::lif::LeakyLayer;
pub use layer::{Layer, LayerInfo, LayerOps};
pub use model::Network;
pub use rng::RandomSource;
