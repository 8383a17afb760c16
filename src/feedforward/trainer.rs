use rand::{distributions::Uniform, prelude::Distribution, Rng};
use thiserror::Error;
use tracing::debug;

use super::error::{DimensionMismatch, SizeMismatch};
use super::net::Network;
use super::record::IORecord;

/// Network trainer structure.
///
/// Training procedure will look like this:
/// * One builds `Trainer` by calling `Network::build_trainer`, which will consume `Network`.
/// * Training data is processed record by record via `Trainer::train_epoch`,
/// `Trainer::train_epochs` or `Trainer::train_random`; every record is one gradient
/// descent step. At any time one can call `Trainer::net_mut` to get access to
/// `Network::compute_for`.
/// * Error estimation is possible via `Trainer::test_batch`.
/// * Once finished training, one can use `Trainer::teardown` to get `Network` object back.
///
/// Every method checks all records before touching the network, so a bad record
/// never leaves an epoch half done.
#[derive(Debug)]
pub struct Trainer {
    pub(crate) net: Network,

    /// Number of completed epochs.
    pub(crate) epochs: usize,
}

impl Trainer {
    /// Consumes `Network` and builds `Trainer` object containing it.
    pub(super) fn build(net: Network) -> Trainer {
        Trainer { net, epochs: 0 }
    }

    /// Returns reference to contained `Network`.
    pub fn net_ref(&self) -> &Network {
        &self.net
    }

    /// Returns mutable reference to contained `Network`, allowing the use of `Network::compute_for`.
    pub fn net_mut(&mut self) -> &mut Network {
        &mut self.net
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Checks every record against the input and output layers.
    fn check_records(&self, records: &[IORecord]) -> Result<(), TrainError> {
        let (inputs_len, outputs_len) = (self.net.input_size(), self.net.output_size());
        for (i, record) in records.iter().enumerate() {
            if record.inputs().len() != inputs_len {
                return Err(TrainError::WrongSampleInputsCount(
                    i,
                    SizeMismatch {
                        expected: inputs_len,
                        got: record.inputs().len(),
                    },
                ));
            }
            if record.outputs().len() != outputs_len {
                return Err(TrainError::WrongSampleDesiredOutputsCount(
                    i,
                    SizeMismatch {
                        expected: outputs_len,
                        got: record.outputs().len(),
                    },
                ));
            }
        }
        Ok(())
    }

    /// Trains on every record once, in the given order.
    pub fn train_epoch(&mut self, records: &[IORecord]) -> Result<(), TrainError> {
        self.check_records(records)?;
        for record in records {
            self.net.train_record(record)?;
        }
        self.epochs += 1;
        Ok(())
    }

    /// Runs `epochs` ordered epochs over `records`.
    ///
    /// # Returns
    /// * The mean error over `records` after the last epoch (see `Trainer::test_batch`).
    ///
    /// # Examples
    /// ```
    /// # use neuronet::feedforward::{IORecord, Network};
    /// let records = vec![
    ///     IORecord::new(vec![0.0, 0.0], vec![0.0]),
    ///     IORecord::new(vec![1.0, 1.0], vec![1.0]),
    /// ];
    /// let mut trainer = Network::new(&[2, 3, 1], 0.1).unwrap().build_trainer();
    /// let error = trainer.train_epochs(&records, 10).unwrap();
    /// assert_eq!(trainer.epochs(), 10);
    /// assert!(error >= 0.0);
    /// ```
    pub fn train_epochs(&mut self, records: &[IORecord], epochs: usize) -> Result<f64, TrainError> {
        self.check_records(records)?;
        for _ in 0..epochs {
            for record in records {
                self.net.train_record(record)?;
            }
            self.epochs += 1;
        }
        let error = self.test_batch(records)?;
        debug!(epochs = self.epochs, error, "training done");
        Ok(error)
    }

    /// Trains on `samples_count` records drawn uniformly from `records`.
    ///
    /// # Returns
    /// * Indices of the drawn records, in training order.
    pub fn train_random<R: Rng + ?Sized>(
        &mut self,
        records: &[IORecord],
        samples_count: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>, TrainError> {
        self.check_records(records)?;
        if records.is_empty() || samples_count == 0 {
            return Ok(Vec::new());
        }

        let indices_between = Uniform::from(0..records.len());
        let mut indices = Vec::with_capacity(samples_count);
        for _ in 0..samples_count {
            let index = indices_between.sample(rng);
            self.net.train_record(&records[index])?;
            indices.push(index);
        }
        debug!(samples_count, "random training done");
        Ok(indices)
    }

    /// Mean of `Network::test_record` over `records`, `0.0` for no records.
    pub fn test_batch(&mut self, records: &[IORecord]) -> Result<f64, TrainError> {
        self.check_records(records)?;
        if records.is_empty() {
            return Ok(0.0);
        }
        let mut error_sum = 0.0;
        for record in records {
            error_sum += self.net.test_record(record)?;
        }
        Ok(error_sum / records.len() as f64)
    }

    /// Consumes `Trainer` object and returns contained `Network` back.
    pub fn teardown(self) -> Network {
        self.net
    }
}

#[derive(Debug, Clone, Error)]
pub enum TrainError {
    #[error(
        "Expected {} input(s), but samples[{}] got {}!",
        .1.expected, .0, .1.got
    )]
    WrongSampleInputsCount(usize, SizeMismatch),
    #[error(
        "Expected {} desired output(s), but samples[{}] got {}!",
        .1.expected, .0, .1.got
    )]
    WrongSampleDesiredOutputsCount(usize, SizeMismatch),
    #[error(transparent)]
    Dimension(#[from] DimensionMismatch),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn trainer(seed: u64) -> Trainer {
        Network::with_rng(&[2, 3, 1], 0.1, &mut ChaCha8Rng::seed_from_u64(seed))
            .unwrap()
            .build_trainer()
    }

    fn records() -> Vec<IORecord> {
        vec![
            IORecord::new(vec![0.0, 1.0], vec![1.0]),
            IORecord::new(vec![1.0, 0.0], vec![1.0]),
            IORecord::new(vec![1.0, 1.0], vec![0.0]),
        ]
    }

    #[test]
    fn bad_record_stops_before_training() {
        let mut trainer = trainer(1);
        let before = trainer.net_ref().serialize();
        let mut records = records();
        records.push(IORecord::new(vec![1.0], vec![0.0]));

        let err = trainer.train_epoch(&records).unwrap_err();
        assert!(matches!(
            err,
            TrainError::WrongSampleInputsCount(3, SizeMismatch { expected: 2, got: 1 })
        ));
        assert_eq!(trainer.net_ref().serialize(), before);
        assert_eq!(trainer.epochs(), 0);
    }

    #[test]
    fn bad_desired_outputs_are_reported() {
        let mut trainer = trainer(2);
        let records = vec![IORecord::new(vec![1.0, 0.0], vec![0.0, 1.0])];
        assert!(matches!(
            trainer.test_batch(&records),
            Err(TrainError::WrongSampleDesiredOutputsCount(0, _))
        ));
    }

    #[test]
    fn epoch_equals_record_by_record_training() {
        let mut trainer = trainer(3);
        let mut net = trainer.net_ref().clone();

        trainer.train_epoch(&records()).unwrap();
        for record in &records() {
            net.train_record(record).unwrap();
        }
        assert_eq!(trainer.net_ref().serialize(), net.serialize());
        assert_eq!(trainer.epochs(), 1);
    }

    #[test]
    fn test_batch_is_mean_of_record_errors() {
        let mut trainer = trainer(4);
        let records = records();
        let mut net = trainer.net_ref().clone();
        let expected = records
            .iter()
            .map(|r| net.test_record(r).unwrap())
            .sum::<f64>()
            / records.len() as f64;
        assert_eq!(trainer.test_batch(&records).unwrap(), expected);
        assert_eq!(trainer.test_batch(&[]).unwrap(), 0.0);
    }

    #[test]
    fn train_random_draws_requested_samples() {
        let mut trainer = trainer(5);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let indices = trainer.train_random(&records(), 25, &mut rng).unwrap();
        assert_eq!(indices.len(), 25);
        assert!(indices.iter().all(|&i| i < 3));
        assert!(trainer.train_random(&[], 10, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn teardown_returns_trained_network() {
        let mut trainer = trainer(6);
        trainer.train_epochs(&records(), 3).unwrap();
        let trained = trainer.net_ref().serialize();
        let net = trainer.teardown();
        assert_eq!(net.serialize(), trained);
    }
}
