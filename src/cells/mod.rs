//! # Recurrent Cells
//!
//! The state controller never looks inside the cell it drives. A cell is any
//! type implementing [`RecurrentCell`]: one `step` that maps an input batch and
//! an `(h, c)` pair to the next `(h, c)` pair.
//!
//! | Cell | Description |
//! |------|-------------|
//! | [`LSTMCell`] | Standard LSTM, used by [`LstmConfig::init`](crate::rnn::LstmConfig::init) |
//!
//! ## Tensor Shapes
//!
//! | Tensor | Shape |
//! |--------|-------|
//! | `input` | `[rows, input_size]` |
//! | `h`, `c` | `[rows, hidden_size]` |
//!
//! ## Custom cells
//!
//! ```ignore
//! struct Decay;
//!
//! impl<B: Backend> RecurrentCell<B> for Decay {
//!     fn step(&self, x: Tensor<B, 2>, (h, c): (Tensor<B, 2>, Tensor<B, 2>))
//!         -> (Tensor<B, 2>, Tensor<B, 2>)
//!     {
//!         (h * 0.5 + x.clone(), c + x)
//!     }
//!     fn input_size(&self) -> usize { 4 }
//!     fn hidden_size(&self) -> usize { 4 }
//! }
//!
//! let lstm = LstmConfig::new(vec![4], 4, MergeMode::Inner).init_with_cell(Decay, &device)?;
//! ```

pub mod lstm_cell;

pub use lstm_cell::LSTMCell;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Single-timestep recurrent transition driven by the state controller.
pub trait RecurrentCell<B: Backend> {
    /// Advance one timestep.
    ///
    /// # Arguments
    /// * `input` - Input batch `[rows, input_size]`
    /// * `state` - `(h, c)`, each `[rows, hidden_size]`
    ///
    /// # Returns
    /// The next `(h, c)`, same shapes as `state`
    fn step(
        &self,
        input: Tensor<B, 2>,
        state: (Tensor<B, 2>, Tensor<B, 2>),
    ) -> (Tensor<B, 2>, Tensor<B, 2>);

    /// Number of input features the cell consumes.
    fn input_size(&self) -> usize;

    /// Number of hidden units in `h` and `c`.
    fn hidden_size(&self) -> usize;
}
