use rand::{distributions::Uniform, prelude::Distribution, Rng};
use std::{fmt, ops::Range};

use super::connection::{Connection, ConnectionId, NeuronId};
use super::error::SizeMismatch;

/// Single neuron of the network.
///
/// The neuron does not own its connections: it keeps handles into the connection
/// arena of the network. Incoming connections of one neuron are always stored
/// contiguously in the arena (see `Layer::join_layers`), so they are kept as a range.
#[derive(Debug, Clone)]
pub struct Neuron {
    id: NeuronId,
    bias: f64,
    /// Pre-activation value.
    input_value: f64,
    /// Post-activation value.
    output_value: f64,
    gradient: f64,
    rate: f64,
    inputs: Range<ConnectionId>,
    outputs: Vec<ConnectionId>,
}

impl Neuron {
    /// Returns neuron with a random bias from `[-1, 1)`.
    pub(super) fn new<R: Rng + ?Sized>(id: NeuronId, learning_rate: f64, rng: &mut R) -> Self {
        Neuron {
            id,
            bias: Uniform::new(-1.0, 1.0).sample(rng),
            input_value: 0.0,
            output_value: 0.0,
            gradient: 0.0,
            rate: learning_rate,
            inputs: 0..0,
            outputs: Vec::new(),
        }
    }

    pub(super) fn add_input_connection(&mut self, connection: ConnectionId) {
        if self.inputs.is_empty() {
            self.inputs = connection..connection;
        }
        debug_assert_eq!(
            self.inputs.end, connection,
            "incoming connections of a neuron must be contiguous"
        );
        self.inputs.end = connection + 1;
    }

    pub(super) fn add_output_connection(&mut self, connection: ConnectionId) {
        self.outputs.push(connection);
    }

    pub fn id(&self) -> NeuronId {
        self.id
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Post-activation value.
    pub fn value(&self) -> f64 {
        self.output_value
    }

    /// Pre-activation value.
    pub fn input_value(&self) -> f64 {
        self.input_value
    }

    pub fn gradient(&self) -> f64 {
        self.gradient
    }

    pub fn learning_rate(&self) -> f64 {
        self.rate
    }

    /// Handles of incoming connections, in tail order.
    pub fn input_connections(&self) -> Range<ConnectionId> {
        self.inputs.clone()
    }

    /// Handles of outgoing connections, in head order.
    pub fn output_connections(&self) -> &[ConnectionId] {
        &self.outputs
    }

    /// Hyperbolic tangent.
    pub(super) fn transfer(x: f64) -> f64 {
        x.tanh()
    }

    /// Derivative of the hyperbolic tangent: `1 - tanh(x)^2`.
    ///
    /// Gradients evaluate it at the *post*-activation value, not at the weighted sum.
    pub(super) fn transfer_derivative(x: f64) -> f64 {
        let y = x.tanh();
        1.0 - y * y
    }

    /// Sets the value directly, bypassing bias and connections (input layer only).
    pub fn set_value(&mut self, value: f64) {
        self.input_value = value;
        self.output_value = Neuron::transfer(value);
    }

    /// Implements the formula:
    /// `tanh(bias + sum(tail.value * weight))` over incoming connections.
    ///
    /// # Arguments
    /// * `arena` - all connections of the network;
    /// * `prev` - neurons of the previous layer.
    pub(super) fn compute_value(&mut self, arena: &[Connection], prev: &[Neuron]) {
        self.input_value = arena[self.inputs.clone()]
            .iter()
            .fold(self.bias, |sum, c| sum + prev[c.tail.index].output_value * c.weight);
        self.output_value = Neuron::transfer(self.input_value);
    }

    /// Implements the formula:
    /// `2 * (value - desired) * transfer_derivative(value)`.
    pub(super) fn compute_output_gradient(&mut self, desired_output: f64) {
        self.gradient = 2.0
            * (self.output_value - desired_output)
            * Neuron::transfer_derivative(self.output_value);
    }

    /// Implements the formula:
    /// `sum(head.gradient * weight) * transfer_derivative(value)` over outgoing connections.
    ///
    /// # Arguments
    /// * `arena` - all connections of the network;
    /// * `next` - neurons of the next layer, their gradients must be computed already.
    pub(super) fn compute_hidden_gradient(&mut self, arena: &[Connection], next: &[Neuron]) {
        let sum: f64 = self
            .outputs
            .iter()
            .map(|&id| {
                let connection = &arena[id];
                next[connection.head.index].gradient * connection.weight
            })
            .sum();
        self.gradient = sum * Neuron::transfer_derivative(self.output_value);
    }

    /// Gradient descent step on the incoming weights, then on the bias.
    ///
    /// # Arguments
    /// * `incoming` - the arena slice holding exactly this neuron's incoming connections;
    /// * `prev` - neurons of the previous layer.
    pub(super) fn update_inputs(&mut self, incoming: &mut [Connection], prev: &[Neuron]) {
        debug_assert_eq!(incoming.len(), self.inputs.len());
        let step = self.rate * self.gradient;
        for connection in incoming.iter_mut() {
            connection.weight -= step * prev[connection.tail.index].output_value;
        }
        self.bias -= step;
    }

    /// Exports coefficients: incoming weights in connection order, then bias.
    pub fn serialize(&self, arena: &[Connection]) -> Vec<f64> {
        let mut coeffs = Vec::with_capacity(self.inputs.len() + 1);
        coeffs.extend(arena[self.inputs.clone()].iter().map(|c| c.weight));
        coeffs.push(self.bias);
        coeffs
    }

    /// Checks that `weights` fits this neuron (incoming weights + bias).
    pub(super) fn check_shape(&self, weights: &[f64]) -> Result<(), SizeMismatch> {
        if weights.len() != self.inputs.len() + 1 {
            return Err(SizeMismatch {
                expected: self.inputs.len() + 1,
                got: weights.len(),
            });
        }
        Ok(())
    }

    /// Overwrites incoming weights positionally and takes bias from the last value.
    ///
    /// # Arguments
    /// * `incoming` - the arena slice holding exactly this neuron's incoming connections;
    /// * `weights` - coefficients in the `serialize` layout.
    ///
    /// # Returns
    /// * `Ok(())` if `size(weights)` = `size(incoming)` + `1`(bias);
    /// * `Err(SizeMismatch)` otherwise, nothing is changed then.
    pub(super) fn deserialize(
        &mut self,
        incoming: &mut [Connection],
        weights: &[f64],
    ) -> Result<(), SizeMismatch> {
        self.check_shape(weights)?;
        if let Some((&bias, connection_weights)) = weights.split_last() {
            for (connection, &weight) in incoming.iter_mut().zip(connection_weights) {
                connection.set_weight(weight);
            }
            self.bias = bias;
        }
        Ok(())
    }
}

impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Neuron[{} input(s), {} output(s), bias = {}]",
            self.inputs.len(),
            self.outputs.len(),
            self.bias
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Two input neurons feeding one head neuron.
    fn fixture() -> (Vec<Neuron>, Neuron, Vec<Connection>) {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut prev = vec![
            Neuron::new(NeuronId::new(0, 0), 0.5, &mut rng),
            Neuron::new(NeuronId::new(0, 1), 0.5, &mut rng),
        ];
        let mut head = Neuron::new(NeuronId::new(1, 0), 0.5, &mut rng);
        let mut arena = Vec::new();
        for tail in prev.iter_mut() {
            Connection::join(&mut arena, tail, &mut head, &mut rng);
        }
        head.deserialize(&mut arena, &[0.5, -0.25, 0.1]).unwrap();
        prev[0].set_value(1.0);
        prev[1].set_value(-2.0);
        (prev, head, arena)
    }

    #[test]
    fn set_value_applies_activation() {
        let (prev, _, _) = fixture();
        assert_relative_eq!(prev[0].value(), 1.0f64.tanh());
        assert_eq!(prev[0].input_value(), 1.0);
    }

    #[test]
    fn compute_value_sums_weighted_tails() {
        let (prev, mut head, arena) = fixture();
        head.compute_value(&arena, &prev);
        let expected = 0.1 + 0.5 * 1.0f64.tanh() - 0.25 * (-2.0f64).tanh();
        assert_relative_eq!(head.input_value(), expected);
        assert_relative_eq!(head.value(), expected.tanh());
    }

    #[test]
    fn output_gradient_uses_post_activation_derivative() {
        let (prev, mut head, arena) = fixture();
        head.compute_value(&arena, &prev);
        head.compute_output_gradient(1.0);
        let y = head.value();
        let d = 1.0 - y.tanh() * y.tanh();
        assert_relative_eq!(head.gradient(), 2.0 * (y - 1.0) * d);
    }

    #[test]
    fn hidden_gradient_sums_downstream() {
        let (mut prev, mut head, arena) = fixture();
        head.compute_value(&arena, &prev);
        head.compute_output_gradient(0.0);
        let next = vec![head];
        prev[1].compute_hidden_gradient(&arena, &next);
        let y = prev[1].value();
        let expected = next[0].gradient() * -0.25 * (1.0 - y.tanh() * y.tanh());
        assert_relative_eq!(prev[1].gradient(), expected);
    }

    #[test]
    fn update_inputs_steps_weights_then_bias() {
        let (prev, mut head, mut arena) = fixture();
        head.compute_value(&arena, &prev);
        head.compute_output_gradient(0.0);
        let g = head.gradient();
        head.update_inputs(&mut arena, &prev);
        assert_relative_eq!(arena[0].weight(), 0.5 - 0.5 * g * prev[0].value());
        assert_relative_eq!(arena[1].weight(), -0.25 - 0.5 * g * prev[1].value());
        assert_relative_eq!(head.bias(), 0.1 - 0.5 * g);
    }

    #[test]
    fn serialize_puts_bias_last() {
        let (_, head, arena) = fixture();
        assert_eq!(head.serialize(&arena), vec![0.5, -0.25, 0.1]);
    }

    #[test]
    fn deserialize_rejects_wrong_length() {
        let (_, mut head, mut arena) = fixture();
        let err = head.deserialize(&mut arena, &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, SizeMismatch { expected: 3, got: 2 });
        assert_eq!(head.serialize(&arena), vec![0.5, -0.25, 0.1]);
    }
}
