use pyo3::prelude::*;

use super::backup::Backup;
use super::trainer::{ConsumableTrainer, Trainer};
use crate::feedforward::{
    DimensionMismatch, IORecord, Network as InnerNetwork, NewNetError, ShapeMismatch,
};
use crate::{Impl_to_PyErr, MakeConsumable};

MakeConsumable!(ConsumableNetwork, InnerNetwork, Network);

#[pyclass]
pub struct Network {
    pub(super) net: ConsumableNetwork,
}

#[pymethods]
impl Network {
    #[new]
    pub fn new(
        topology: Vec<usize>,
        learning_rate: f64,
        workers: Option<usize>,
    ) -> Result<Self, NewNetError> {
        let mut net = InnerNetwork::new(&topology, learning_rate)?;
        if let Some(workers) = workers {
            net = net.with_workers(workers)?;
        }
        Ok(Self {
            net: ConsumableNetwork::acquire(net),
        })
    }

    #[staticmethod]
    pub fn from_backup(backup: PyRef<Backup>) -> Result<Self, NewNetError> {
        Ok(Self {
            net: ConsumableNetwork::acquire(InnerNetwork::from_backup(&backup.backup)?),
        })
    }

    pub fn topology(&self) -> Vec<usize> {
        self.net.get_ref().topology()
    }

    pub fn learning_rate(&self) -> f64 {
        self.net.get_ref().learning_rate()
    }

    pub fn compute_for(&mut self, inputs: Vec<f64>) -> Result<Vec<f64>, DimensionMismatch> {
        self.net.get_ref_mut().compute_for(&inputs)
    }

    pub fn train_record(
        &mut self,
        inputs: Vec<f64>,
        desired_outputs: Vec<f64>,
    ) -> Result<(), DimensionMismatch> {
        self.net
            .get_ref_mut()
            .train_record(&IORecord::new(inputs, desired_outputs))
    }

    pub fn test_record(
        &mut self,
        inputs: Vec<f64>,
        desired_outputs: Vec<f64>,
    ) -> Result<f64, DimensionMismatch> {
        self.net
            .get_ref_mut()
            .test_record(&IORecord::new(inputs, desired_outputs))
    }

    pub fn serialize(&self) -> Backup {
        Backup {
            backup: self.net.get_ref().serialize(),
        }
    }

    pub fn deserialize(&mut self, weights: Vec<Vec<Vec<f64>>>) -> Result<(), ShapeMismatch> {
        self.net.get_ref_mut().deserialize(&weights)
    }

    pub fn build_trainer(&mut self) -> Trainer {
        Trainer {
            trainer: ConsumableTrainer::acquire(self.net.release().build_trainer()),
        }
    }
}

Impl_to_PyErr!(for NewNetError, DimensionMismatch, ShapeMismatch);
