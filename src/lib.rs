//! Feedforward neural network engine: neuron/connection/layer graph, forward and
//! backward propagation, and a plain-text weight file format.
//!
//! ```
//! use neuronet::feedforward::{Backup, IORecord, Network};
//!
//! let mut net = Network::new(&[2, 3, 1], 0.1).unwrap();
//! net.train_record(&IORecord::new(vec![1.0, 0.0], vec![1.0])).unwrap();
//!
//! let backup: Backup = net.serialize().to_string().parse().unwrap();
//! let mut restored = Network::from_backup(&backup).unwrap();
//! assert_eq!(
//!     net.compute_for(&[0.0, 1.0]).unwrap(),
//!     restored.compute_for(&[0.0, 1.0]).unwrap()
//! );
//! ```

pub mod feedforward;

#[cfg(feature = "python")]
mod python_ffi;
