//! # episodic-lstm
//!
//! Recurrent state management for reinforcement-learning models, built on Burn.
//!
//! ## Features
//!
//! - **Stateful LSTM**: hidden state carried across calls and episode boundaries
//! - **Episode Resets**: state zeroed exactly where an episode starts, including mid-sequence
//! - **Multi-sample Batches**: one carried state per sequence for oversampled
//!   batches (e.g. an IQN layer in front of the LSTM), merged by averaging
//! - **Pluggable Cells**: any [`RecurrentCell`](cells::RecurrentCell) can be driven
//!
//! ## Quick Start
//!
//! ```rust
//! use episodic_lstm::prelude::*;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! type Backend = NdArray<f32>;
//! let device = Default::default();
//!
//! let mut lstm = LstmConfig::new(vec![8], 16, MergeMode::Inner)
//!     .init::<Backend>(&device)
//!     .unwrap();
//!
//! // Two environments, both starting an episode
//! let snapshot = lstm.get_state(&[true, true]).unwrap();
//! let obs = Tensor::<Backend, 2>::zeros([2, 8], &device);
//! let out = lstm.forward_snapshot(obs, &snapshot).unwrap();
//!
//! assert_eq!(out.dims(), [2, 16]);
//! assert_eq!(lstm.get_state(&[false, false]).unwrap().hx.dim(), (2, 16));
//! ```

pub mod cells;
pub mod error;
pub mod multi_sample;
pub mod rnn;
pub mod state;

pub mod prelude {
    pub use crate::cells::{LSTMCell, RecurrentCell};
    pub use crate::error::StateError;
    pub use crate::multi_sample::MergeMode;
    pub use crate::rnn::{LstmConfig, StatefulLstm};
    pub use crate::state::{HiddenState, StateSnapshot};
}
