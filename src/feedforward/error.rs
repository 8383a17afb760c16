use std::io;

use thiserror::Error;

/// Error structure for collections size mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Expected {expected} values, but got {got}!")]
pub struct SizeMismatch {
    pub expected: usize,
    pub got: usize,
}

/// Error structure for `Network` construction
#[derive(Debug, Error)]
pub enum NewNetError {
    #[error(
        "Network must have at least two layers (input and output), \
        but got topology with len {0}!"
    )]
    BadTopology(usize),
    #[error("Layer {0} must have at least one neuron!")]
    EmptyLayer(usize),
    #[error("Learning rate must lie within (0, 1), but got {0}!")]
    BadLearningRate(f64),
    #[error("Backup weights do not fit the topology: {0}")]
    BadWeights(#[from] ShapeMismatch),
    #[error("Could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Input or desired output vector length disagrees with the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DimensionMismatch {
    #[error("Expected {} input(s), but got {}!", .0.expected, .0.got)]
    Inputs(SizeMismatch),
    #[error("Expected {} output(s), but got {}!", .0.expected, .0.got)]
    Outputs(SizeMismatch),
}

/// Serialized weights disagree with the live topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShapeMismatch {
    #[error("Expected weights for {} layers, but got {}!", .0.expected, .0.got)]
    Layers(SizeMismatch),
    #[error(
        "Layer {layer}: expected weights for {} neurons, but got {}!",
        .mismatch.expected, .mismatch.got
    )]
    Neurons { layer: usize, mismatch: SizeMismatch },
    #[error(
        "Layer {layer}, neuron {neuron}: expected {} coefficients (weights + bias), but got {}!",
        .mismatch.expected, .mismatch.got
    )]
    Weights {
        layer: usize,
        neuron: usize,
        mismatch: SizeMismatch,
    },
}

/// Failure while reading or writing a weight file.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Backup ended before {0} was read!")]
    UnexpectedEnd(&'static str),
    #[error("Could not parse {what} from {token:?}!")]
    Malformed { what: &'static str, token: String },
}
