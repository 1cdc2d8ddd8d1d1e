use std::collections::TryReserveError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or running a network.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{layer}: widths must be > 0 (in_width = {in_width}, out_width = {out_width})")]
    InvalidDimensions {
        layer: &'static str,
        in_width: usize,
        out_width: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("allocation failure: {0}")]
    AllocationFailure(#[from] TryReserveError),

    #[error("a leaky layer needs a preceding layer to infer its width")]
    NoPrecedingLayer,

    #[error("layer {index} is not dense, a leaky layer can only follow a dense layer")]
    PrecedingLayerNotDense { index: usize },

    #[error("shape mismatch at {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("network has no layers")]
    EmptyStack,

    #[error("forward worker panicked")]
    WorkerPanicked,

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}
