use rand::{distributions::Uniform, prelude::Distribution, Rng};
use std::fmt;

use super::neuron::Neuron;

/// Handle of a connection inside the network's connection arena.
pub type ConnectionId = usize;

/// Stable position of a neuron: `(layer index, index within layer)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NeuronId {
    pub layer: usize,
    pub index: usize,
}

impl NeuronId {
    pub fn new(layer: usize, index: usize) -> Self {
        NeuronId { layer, index }
    }
}

/// Directed weighted edge from `tail` (layer `i - 1`) to `head` (layer `i`).
///
/// Connections live once in the arena owned by `Network`; both endpoints refer to
/// them by `ConnectionId`, so neither neuron can drop one on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub(super) weight: f64,
    pub(super) tail: NeuronId,
    pub(super) head: NeuronId,
}

impl Connection {
    /// Creates a connection with a random weight from `[-1, 1)`, stores it in `arena`
    /// and registers it in `tail`'s outgoing and `head`'s incoming lists.
    ///
    /// # Returns
    /// Handle of the new connection.
    pub(super) fn join<R: Rng + ?Sized>(
        arena: &mut Vec<Connection>,
        tail: &mut Neuron,
        head: &mut Neuron,
        rng: &mut R,
    ) -> ConnectionId {
        let weight = Uniform::new(-1.0, 1.0).sample(rng);
        let id = arena.len();
        arena.push(Connection {
            weight,
            tail: tail.id(),
            head: head.id(),
        });
        tail.add_output_connection(id);
        head.add_input_connection(id);
        id
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub fn tail(&self) -> NeuronId {
        self.tail
    }

    pub fn head(&self) -> NeuronId {
        self.head
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Connection[({}, {}) -> ({}, {}), weight = {:.3}]",
            self.tail.layer, self.tail.index, self.head.layer, self.head.index, self.weight
        )
    }
}
