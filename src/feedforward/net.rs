use rand::Rng;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{convert::TryFrom, fmt, sync::Arc};
use tracing::{debug, trace, warn};

use super::backup::Backup;
use super::connection::Connection;
use super::error::{DimensionMismatch, NewNetError, ShapeMismatch, SizeMismatch};
use super::layer::Layer;
use super::record::IORecord;
use super::trainer::Trainer;

/// Neural network structure
#[derive(Debug, Clone)]
pub struct Network {
    /// Layers from input to output.
    layers: Vec<Layer>,

    /// Arena of all connections of all layers.
    ///
    /// Connections between layers `i - 1` and `i` form one block, and inside the block
    /// every neuron of layer `i` owns a run of `size(layer i - 1)` connections:
    /// `connections = [layer_1][layer_2] ... [layer_N]`
    /// `layer = [neuron_1][neuron_2] ... [neuron_N]`
    /// `neuron = [connection from prev neuron_1] ... [connection from prev neuron_N]`
    connections: Vec<Connection>,

    /// Shared by every neuron, fixed at construction.
    learning_rate: f64,

    /// Workers for per-neuron fan-out inside a layer. `None` runs everything on the
    /// calling thread.
    pool: Option<Arc<ThreadPool>>,
}

impl Network {
    /// Returns network for given topology.
    /// Weights and biases are random values from `[-1, 1)`.
    ///
    /// # Arguments
    /// * `topology` - number of neurons in each layer, input layer first;
    /// * `learning_rate` - gradient descent step, from `(0, 1)`.
    ///
    /// # Returns
    /// * `Ok(Network)` if topology has at least two non-empty layers and the rate is valid;
    /// * `Err(NewNetError)` otherwise.
    ///
    /// # Examples
    /// ```
    /// # use neuronet::feedforward::Network;
    /// let mut net = Network::new(&[3, 4, 4, 1], 0.05).unwrap();
    /// let outputs = net.compute_for(&[0.0, 1.0, 1.0]).unwrap();
    /// assert_eq!(outputs.len(), 1);
    /// ```
    pub fn new(topology: &[usize], learning_rate: f64) -> Result<Network, NewNetError> {
        Network::with_rng(topology, learning_rate, &mut rand::thread_rng())
    }

    /// Same as `Network::new`, drawing initial coefficients from `rng`.
    ///
    /// # Examples
    /// ```
    /// # use neuronet::feedforward::Network;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let a = Network::with_rng(&[2, 3, 1], 0.1, &mut StdRng::seed_from_u64(42)).unwrap();
    /// let b = Network::with_rng(&[2, 3, 1], 0.1, &mut StdRng::seed_from_u64(42)).unwrap();
    /// assert_eq!(a.serialize(), b.serialize());
    /// ```
    pub fn with_rng<R: Rng + ?Sized>(
        topology: &[usize],
        learning_rate: f64,
        rng: &mut R,
    ) -> Result<Network, NewNetError> {
        if topology.len() < 2 {
            return Err(NewNetError::BadTopology(topology.len()));
        }
        if let Some(index) = topology.iter().position(|&size| size == 0) {
            return Err(NewNetError::EmptyLayer(index));
        }
        if !(learning_rate > 0.0 && learning_rate < 1.0) {
            return Err(NewNetError::BadLearningRate(learning_rate));
        }

        let mut layers: Vec<Layer> = topology
            .iter()
            .enumerate()
            .map(|(index, &size)| Layer::new(index, size, learning_rate, rng))
            .collect();

        let connections_total = topology.windows(2).map(|pair| pair[0] * pair[1]).sum();
        let mut connections = Vec::with_capacity(connections_total);
        for i in 1..layers.len() {
            let (joined, rest) = layers.split_at_mut(i);
            Layer::join_layers(&mut joined[i - 1], &mut rest[0], &mut connections, rng);
        }

        debug!(
            ?topology,
            learning_rate,
            connections = connections.len(),
            "network built"
        );

        Ok(Network {
            layers,
            connections,
            learning_rate,
            pool: None,
        })
    }

    /// Builds network from `backup`: topology and learning rate first, then coefficients.
    ///
    /// # Returns
    /// * `Ok(Network)` if the backup is consistent;
    /// * `Err(NewNetError)` otherwise, no network is built then.
    pub fn from_backup(backup: &Backup) -> Result<Network, NewNetError> {
        let mut net = Network::new(backup.topology(), backup.learning_rate())?;
        net.deserialize(backup.weights())?;
        Ok(net)
    }

    /// Attaches a pool of `workers` threads. Per-neuron work of one layer is then
    /// spread over the pool; layers still run one after another.
    pub fn with_workers(self, workers: usize) -> Result<Network, NewNetError> {
        let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
        Ok(self.with_pool(Arc::new(pool)))
    }

    /// Attaches an existing pool, see `Network::with_workers`.
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Network {
        debug!(workers = pool.current_num_threads(), "worker pool attached");
        self.pool = Some(pool);
        self
    }

    /// Detaches the worker pool, computations go back to the calling thread.
    pub fn sequential(mut self) -> Network {
        self.pool = None;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn topology(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::len).collect()
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].len()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].len()
    }

    fn output_layer(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }

    fn check_inputs(&self, inputs: &[f64]) -> Result<(), DimensionMismatch> {
        if inputs.len() != self.input_size() {
            return Err(DimensionMismatch::Inputs(SizeMismatch {
                expected: self.input_size(),
                got: inputs.len(),
            }));
        }
        Ok(())
    }

    /// Assigns the input layer, then computes every next layer in order.
    fn propagate_forward(&mut self, inputs: &[f64]) -> Result<(), DimensionMismatch> {
        self.layers[0]
            .assign(inputs)
            .map_err(DimensionMismatch::Inputs)?;

        let pool = self.pool.as_deref();
        for i in 1..self.layers.len() {
            // Layer `i - 1` is final here
            let (computed, rest) = self.layers.split_at_mut(i);
            rest[0].compute_values(&self.connections, &computed[i - 1], pool);
        }
        trace!("forward pass done");
        Ok(())
    }

    /// Computes all gradients from the output layer inward, then updates all weights
    /// from the output layer inward. No weight changes before the last gradient is known.
    ///
    /// `desired_outputs` must match the output layer.
    fn propagate_backward(&mut self, desired_outputs: &[f64]) {
        let pool = self.pool.as_deref();
        let layers_count = self.layers.len();

        self.layers[layers_count - 1].compute_output_gradients(desired_outputs, pool);
        for i in (1..layers_count - 1).rev() {
            let (current, next) = self.layers.split_at_mut(i + 1);
            current[i].compute_hidden_gradients(&self.connections, &next[0], pool);
        }

        for i in (1..layers_count).rev() {
            let (prev, current) = self.layers.split_at_mut(i);
            current[0].update_inputs(&mut self.connections, &prev[i - 1], pool);
        }
        trace!("backward pass done");
    }

    /// Calculates output of the network using given input.
    ///
    /// # Returns
    /// * `Ok(Vec<f64>)` with output layer values if `inputs` fits the input layer;
    /// * `Err(DimensionMismatch)` otherwise, the network is untouched then.
    pub fn compute_for(&mut self, inputs: &[f64]) -> Result<Vec<f64>, DimensionMismatch> {
        self.check_inputs(inputs)?;
        self.propagate_forward(inputs)?;
        Ok(self.output_layer().export_values())
    }

    /// One gradient descent step on `record`: forward pass, then backward pass.
    ///
    /// # Examples
    /// ```
    /// # use neuronet::feedforward::{IORecord, Network};
    /// let mut net = Network::new(&[2, 2, 1], 0.1).unwrap();
    /// let record = IORecord::new(vec![1.0, 0.0], vec![1.0]);
    /// let before = net.test_record(&record).unwrap();
    /// for _ in 0..50 {
    ///     net.train_record(&record).unwrap();
    /// }
    /// assert!(net.test_record(&record).unwrap() < before);
    /// ```
    pub fn train_record(&mut self, record: &IORecord) -> Result<(), DimensionMismatch> {
        self.check_inputs(record.inputs())?;
        if record.outputs().len() != self.output_size() {
            return Err(DimensionMismatch::Outputs(SizeMismatch {
                expected: self.output_size(),
                got: record.outputs().len(),
            }));
        }
        self.propagate_forward(record.inputs())?;
        self.propagate_backward(record.outputs());
        Ok(())
    }

    /// Forward pass on `record`, then the squared error sum of the output layer.
    ///
    /// The error is not normalized by the output size. Desired outputs may be
    /// shorter than the output layer, then trailing neurons are not counted.
    pub fn test_record(&mut self, record: &IORecord) -> Result<f64, DimensionMismatch> {
        self.check_inputs(record.inputs())?;
        if record.outputs().len() > self.output_size() {
            return Err(DimensionMismatch::Outputs(SizeMismatch {
                expected: self.output_size(),
                got: record.outputs().len(),
            }));
        }
        self.propagate_forward(record.inputs())?;
        Ok(self.output_layer().calculate_error(record.outputs()))
    }

    /// Exports topology, learning rate and coefficients of every layer.
    pub fn serialize(&self) -> Backup {
        let weights = self
            .layers
            .iter()
            .map(|layer| layer.serialize(&self.connections))
            .collect();
        Backup::new(self.topology(), self.learning_rate, weights)
    }

    /// Overwrites coefficients of every layer.
    ///
    /// # Returns
    /// * `Ok(())` if `weights` has the exact shape of the network;
    /// * `Err(ShapeMismatch)` otherwise, no neuron is changed then.
    pub fn deserialize(&mut self, weights: &[Vec<Vec<f64>>]) -> Result<(), ShapeMismatch> {
        if let Err(err) = self.check_shape(weights) {
            warn!(%err, "weights rejected");
            return Err(err);
        }
        for (layer, layer_weights) in self.layers.iter_mut().zip(weights) {
            layer.deserialize(&mut self.connections, layer_weights)?;
        }
        Ok(())
    }

    fn check_shape(&self, weights: &[Vec<Vec<f64>>]) -> Result<(), ShapeMismatch> {
        if weights.len() != self.layers.len() {
            return Err(ShapeMismatch::Layers(SizeMismatch {
                expected: self.layers.len(),
                got: weights.len(),
            }));
        }
        self.layers
            .iter()
            .zip(weights)
            .try_for_each(|(layer, layer_weights)| layer.check_shape(layer_weights))
    }

    /// Consumes `Network` and builds `Trainer` object containing it.
    /// See `Trainer`'s documentation for details.
    pub fn build_trainer(self) -> Trainer {
        Trainer::build(self)
    }
}

impl TryFrom<&Backup> for Network {
    type Error = NewNetError;

    fn try_from(backup: &Backup) -> Result<Self, Self::Error> {
        Network::from_backup(backup)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Network[{} layers, learning rate = {}]",
            self.layers.len(),
            self.learning_rate
        )?;
        for layer in &self.layers {
            write!(f, "{}", layer)?;
        }
        Ok(())
    }
}
