use pyo3::prelude::*;

use super::net::{ConsumableNetwork, Network};
use crate::feedforward::{DimensionMismatch, IORecord, TrainError, Trainer as InnerTrainer};
use crate::{Impl_to_PyErr, MakeConsumable};

MakeConsumable!(ConsumableTrainer, InnerTrainer, Trainer);

#[pyclass]
pub struct Trainer {
    pub(super) trainer: ConsumableTrainer,
}

/// Converts Python `(inputs, desired_outputs)` pairs into records.
fn to_records(samples: Vec<(Vec<f64>, Vec<f64>)>) -> Vec<IORecord> {
    samples.into_iter().map(IORecord::from).collect()
}

#[pymethods]
impl Trainer {
    pub fn topology(&self) -> Vec<usize> {
        self.trainer.get_ref().net_ref().topology()
    }

    pub fn epochs(&self) -> usize {
        self.trainer.get_ref().epochs()
    }

    pub fn compute_for(&mut self, inputs: Vec<f64>) -> Result<Vec<f64>, DimensionMismatch> {
        self.trainer.get_ref_mut().net_mut().compute_for(&inputs)
    }

    pub fn train_epoch(&mut self, samples: Vec<(Vec<f64>, Vec<f64>)>) -> Result<(), TrainError> {
        self.trainer.get_ref_mut().train_epoch(&to_records(samples))
    }

    pub fn train_epochs(
        &mut self,
        samples: Vec<(Vec<f64>, Vec<f64>)>,
        epochs: usize,
    ) -> Result<f64, TrainError> {
        self.trainer
            .get_ref_mut()
            .train_epochs(&to_records(samples), epochs)
    }

    pub fn train_random(
        &mut self,
        samples: Vec<(Vec<f64>, Vec<f64>)>,
        samples_count: usize,
    ) -> Result<Vec<usize>, TrainError> {
        self.trainer.get_ref_mut().train_random(
            &to_records(samples),
            samples_count,
            &mut rand::thread_rng(),
        )
    }

    pub fn test_batch(&mut self, samples: Vec<(Vec<f64>, Vec<f64>)>) -> Result<f64, TrainError> {
        self.trainer.get_ref_mut().test_batch(&to_records(samples))
    }

    pub fn teardown(&mut self) -> Network {
        Network {
            net: ConsumableNetwork::acquire(self.trainer.release().teardown()),
        }
    }
}

Impl_to_PyErr!(for TrainError);
