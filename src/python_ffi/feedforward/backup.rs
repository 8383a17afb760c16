use pyo3::prelude::*;

use crate::feedforward::{Backup as InnerBackup, BackupError};
use crate::Impl_to_PyErr;

#[pyclass]
pub struct Backup {
    pub(super) backup: InnerBackup,
}

#[pymethods]
impl Backup {
    #[new]
    pub fn new(topology: Vec<usize>, learning_rate: f64, weights: Vec<Vec<Vec<f64>>>) -> Self {
        Self {
            backup: InnerBackup::new(topology, learning_rate, weights),
        }
    }

    pub fn topology(&self) -> Vec<usize> {
        self.backup.topology().to_vec()
    }

    pub fn learning_rate(&self) -> f64 {
        self.backup.learning_rate()
    }

    pub fn weights(&self) -> Vec<Vec<Vec<f64>>> {
        self.backup.weights().to_vec()
    }

    pub fn save_to_file(&self, path: String) -> Result<(), BackupError> {
        self.backup.save_to_file(path)
    }

    #[staticmethod]
    pub fn read_from_file(path: String) -> Result<Self, BackupError> {
        Ok(Self {
            backup: InnerBackup::read_from_file(path)?,
        })
    }

    pub fn dumps(&self) -> String {
        self.backup.to_string()
    }

    #[staticmethod]
    pub fn loads(text: String) -> Result<Self, BackupError> {
        Ok(Self {
            backup: text.parse()?,
        })
    }
}

Impl_to_PyErr!(for BackupError => pyo3::exceptions::PyIOError);
