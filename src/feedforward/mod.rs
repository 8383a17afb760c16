//! Fully-connected feedforward neural network of individual neurons, trained by
//! backpropagation with per-neuron gradient descent

mod backup;
mod connection;
mod error;
mod layer;
mod net;
mod neuron;
mod record;
mod trainer;

pub use backup::*;
pub use connection::*;
pub use error::*;
pub use layer::*;
pub use net::*;
pub use neuron::*;
pub use record::*;
pub use trainer::*;
