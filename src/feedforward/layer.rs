use rand::Rng;
use rayon::{prelude::*, ThreadPool};
use std::{fmt, mem, ops::Range};

use super::connection::{Connection, ConnectionId, NeuronId};
use super::error::{ShapeMismatch, SizeMismatch};
use super::neuron::Neuron;

/// Ordered, fixed-size group of neurons.
#[derive(Debug, Clone)]
pub struct Layer {
    index: usize,
    neurons: Vec<Neuron>,
    /// Arena block holding the incoming connections of all neurons of this layer,
    /// neuron after neuron, each neuron owning `fan_in` consecutive connections.
    incoming: Range<ConnectionId>,
    fan_in: usize,
}

/// Runs `op` for every neuron, fanned out over `pool` if there is one.
/// Returns once every neuron is done.
fn fan_out<F>(pool: Option<&ThreadPool>, neurons: &mut [Neuron], op: F)
where
    F: Fn(usize, &mut Neuron) + Send + Sync,
{
    match pool {
        Some(pool) => pool.install(|| {
            neurons
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, neuron)| op(i, neuron))
        }),
        None => neurons
            .iter_mut()
            .enumerate()
            .for_each(|(i, neuron)| op(i, neuron)),
    }
}

impl Layer {
    pub(super) fn new<R: Rng + ?Sized>(
        index: usize,
        size: usize,
        learning_rate: f64,
        rng: &mut R,
    ) -> Self {
        debug_assert!(size > 0);
        let neurons = (0..size)
            .map(|i| Neuron::new(NeuronId::new(index, i), learning_rate, rng))
            .collect();
        Layer {
            index,
            neurons,
            incoming: 0..0,
            fan_in: 0,
        }
    }

    /// Fully connects every neuron of `prev` to every neuron of `next`.
    ///
    /// Connections are created head by head, so each neuron of `next` gets its
    /// incoming connections as one contiguous run of the arena, in `prev` order.
    pub(super) fn join_layers<R: Rng + ?Sized>(
        prev: &mut Layer,
        next: &mut Layer,
        arena: &mut Vec<Connection>,
        rng: &mut R,
    ) {
        let start = arena.len();
        for head in next.neurons.iter_mut() {
            for tail in prev.neurons.iter_mut() {
                Connection::join(arena, tail, head, rng);
            }
        }
        next.incoming = start..arena.len();
        next.fan_in = prev.neurons.len();
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    /// Sets neuron values positionally (input layer).
    ///
    /// # Returns
    /// * `Ok(())` if `inputs` has one value per neuron;
    /// * `Err(SizeMismatch)` otherwise, nothing is changed then.
    pub(super) fn assign(&mut self, inputs: &[f64]) -> Result<(), SizeMismatch> {
        if inputs.len() != self.neurons.len() {
            return Err(SizeMismatch {
                expected: self.neurons.len(),
                got: inputs.len(),
            });
        }
        for (neuron, &value) in self.neurons.iter_mut().zip(inputs) {
            neuron.set_value(value);
        }
        Ok(())
    }

    pub(super) fn compute_values(
        &mut self,
        arena: &[Connection],
        prev: &Layer,
        pool: Option<&ThreadPool>,
    ) {
        let prev = prev.neurons.as_slice();
        fan_out(pool, &mut self.neurons, |_, neuron| {
            neuron.compute_value(arena, prev)
        });
    }

    pub fn export_values(&self) -> Vec<f64> {
        self.neurons.iter().map(Neuron::value).collect()
    }

    /// Sum of squared differences between neuron values and `desired_outputs`.
    ///
    /// Pairs stop at the shorter of the two: with fewer desired values only the first
    /// neurons take part, extra desired values are ignored.
    pub fn calculate_error(&self, desired_outputs: &[f64]) -> f64 {
        self.neurons
            .iter()
            .zip(desired_outputs)
            .map(|(neuron, &desired)| {
                let partial = neuron.value() - desired;
                partial * partial
            })
            .sum()
    }

    pub(super) fn compute_output_gradients(
        &mut self,
        desired_outputs: &[f64],
        pool: Option<&ThreadPool>,
    ) {
        debug_assert_eq!(desired_outputs.len(), self.neurons.len());
        fan_out(pool, &mut self.neurons, |i, neuron| {
            neuron.compute_output_gradient(desired_outputs[i])
        });
    }

    pub(super) fn compute_hidden_gradients(
        &mut self,
        arena: &[Connection],
        next: &Layer,
        pool: Option<&ThreadPool>,
    ) {
        let next = next.neurons.as_slice();
        fan_out(pool, &mut self.neurons, |_, neuron| {
            neuron.compute_hidden_gradient(arena, next)
        });
    }

    /// Weight and bias update of every neuron. Gradients of the whole network must
    /// be final before the first layer is updated.
    pub(super) fn update_inputs(
        &mut self,
        arena: &mut [Connection],
        prev: &Layer,
        pool: Option<&ThreadPool>,
    ) {
        debug_assert!(self.fan_in > 0, "input layer has no weights to update");
        let block = &mut arena[self.incoming.clone()];
        let prev = prev.neurons.as_slice();
        let fan_in = self.fan_in;
        let neurons = &mut self.neurons;

        match pool {
            Some(pool) => pool.install(|| {
                neurons
                    .par_iter_mut()
                    .zip(block.par_chunks_mut(fan_in))
                    .for_each(|(neuron, incoming)| neuron.update_inputs(incoming, prev))
            }),
            None => {
                for (neuron, incoming) in neurons.iter_mut().zip(block.chunks_mut(fan_in)) {
                    neuron.update_inputs(incoming, prev);
                }
            }
        }
    }

    /// Exports per-neuron coefficients (`Neuron::serialize` layout).
    pub fn serialize(&self, arena: &[Connection]) -> Vec<Vec<f64>> {
        self.neurons
            .iter()
            .map(|neuron| neuron.serialize(arena))
            .collect()
    }

    /// Checks that `weights` fits this layer without changing anything.
    pub(super) fn check_shape(&self, weights: &[Vec<f64>]) -> Result<(), ShapeMismatch> {
        if weights.len() != self.neurons.len() {
            return Err(ShapeMismatch::Neurons {
                layer: self.index,
                mismatch: SizeMismatch {
                    expected: self.neurons.len(),
                    got: weights.len(),
                },
            });
        }
        for (i, (neuron, neuron_weights)) in self.neurons.iter().zip(weights).enumerate() {
            neuron
                .check_shape(neuron_weights)
                .map_err(|mismatch| ShapeMismatch::Weights {
                    layer: self.index,
                    neuron: i,
                    mismatch,
                })?;
        }
        Ok(())
    }

    /// Overwrites coefficients of every neuron.
    ///
    /// The whole shape is checked first, so on `Err` no neuron is changed.
    pub(super) fn deserialize(
        &mut self,
        arena: &mut [Connection],
        weights: &[Vec<f64>],
    ) -> Result<(), ShapeMismatch> {
        self.check_shape(weights)?;

        let layer = self.index;
        let mut remaining = &mut arena[self.incoming.clone()];
        for (i, (neuron, neuron_weights)) in self.neurons.iter_mut().zip(weights).enumerate() {
            // Cutting this neuron's connections from the front and advancing
            let (incoming, tail) =
                mem::take(&mut remaining).split_at_mut(neuron.input_connections().len());
            remaining = tail;

            neuron
                .deserialize(incoming, neuron_weights)
                .map_err(|mismatch| ShapeMismatch::Weights {
                    layer,
                    neuron: i,
                    mismatch,
                })?;
        }
        Ok(())
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Layer[{} neuron(s)]", self.neurons.len())?;
        for neuron in &self.neurons {
            writeln!(f, "\t{}", neuron)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn joined(prev_size: usize, next_size: usize) -> (Layer, Layer, Vec<Connection>) {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut prev = Layer::new(0, prev_size, 0.1, &mut rng);
        let mut next = Layer::new(1, next_size, 0.1, &mut rng);
        let mut arena = Vec::new();
        Layer::join_layers(&mut prev, &mut next, &mut arena, &mut rng);
        (prev, next, arena)
    }

    #[test]
    fn join_layers_connects_fully() {
        let (prev, next, arena) = joined(3, 2);
        assert_eq!(arena.len(), 6);
        for tail in prev.neurons() {
            assert_eq!(tail.output_connections().len(), 2);
        }
        for (h, head) in next.neurons().iter().enumerate() {
            let inputs = head.input_connections();
            assert_eq!(inputs.len(), 3);
            for (t, id) in inputs.enumerate() {
                assert_eq!(arena[id].tail(), NeuronId::new(0, t));
                assert_eq!(arena[id].head(), NeuronId::new(1, h));
            }
        }
    }

    #[test]
    fn assign_rejects_wrong_length() {
        let (mut prev, _, _) = joined(3, 2);
        let before = prev.export_values();
        let err = prev.assign(&[1.0, 2.0]).unwrap_err();
        assert_eq!(err, SizeMismatch { expected: 3, got: 2 });
        assert_eq!(prev.export_values(), before);
    }

    #[test]
    fn calculate_error_is_zero_for_own_values() {
        let (mut prev, _, _) = joined(3, 2);
        prev.assign(&[0.3, -0.6, 0.9]).unwrap();
        let values = prev.export_values();
        assert_eq!(prev.calculate_error(&values), 0.0);
    }

    #[test]
    fn calculate_error_stops_at_desired_length() {
        let (mut prev, _, _) = joined(3, 2);
        prev.assign(&[0.0, 1.0, 1.0]).unwrap();
        // tanh(0) = 0, so only the first neuron takes part
        assert_eq!(prev.calculate_error(&[1.0]), 1.0);
        assert_eq!(prev.calculate_error(&[]), 0.0);
    }

    #[test]
    fn calculate_error_ignores_extra_desired_values() {
        let (mut prev, _, _) = joined(3, 2);
        prev.assign(&[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(prev.calculate_error(&[1.0, 0.0, 0.0, 5.0, -7.0]), 1.0);
    }

    #[test]
    fn deserialize_rejects_neuron_count() {
        let (_, mut next, mut arena) = joined(3, 2);
        let before = next.serialize(&arena);
        let err = next
            .deserialize(&mut arena, &[vec![0.0, 0.0, 0.0, 0.0]])
            .unwrap_err();
        assert_eq!(
            err,
            ShapeMismatch::Neurons {
                layer: 1,
                mismatch: SizeMismatch { expected: 2, got: 1 }
            }
        );
        assert_eq!(next.serialize(&arena), before);
    }

    #[test]
    fn deserialize_is_all_or_nothing() {
        let (_, mut next, mut arena) = joined(3, 2);
        let before = next.serialize(&arena);
        let err = next
            .deserialize(&mut arena, &[vec![1.0, 1.0, 1.0, 1.0], vec![1.0, 1.0]])
            .unwrap_err();
        assert_eq!(
            err,
            ShapeMismatch::Weights {
                layer: 1,
                neuron: 1,
                mismatch: SizeMismatch { expected: 4, got: 2 }
            }
        );
        assert_eq!(next.serialize(&arena), before);
    }

    #[test]
    fn deserialize_then_serialize() {
        let (_, mut next, mut arena) = joined(2, 2);
        let weights = vec![vec![0.1, 0.2, 0.3], vec![-0.1, -0.2, -0.3]];
        next.deserialize(&mut arena, &weights).unwrap();
        assert_eq!(next.serialize(&arena), weights);
    }
}
