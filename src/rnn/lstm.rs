//! Stateful LSTM layer
//!
//! Unrolls a recurrent cell over a flattened `(timestep x sequence)` batch,
//! resets state at embedded episode starts and reconciles multi-sample batches
//! with a single carried state per sequence.

use burn::config::Config;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use log::{trace, warn};

use crate::cells::{LSTMCell, RecurrentCell};
use crate::error::{self, StateError};
use crate::multi_sample::{expand, reduce, repeat_interleave_flags, MergeMode};
use crate::state::{reset_episodes, HiddenState, StateCache, StateSnapshot};

/// Configuration for [`StatefulLstm`]
#[derive(Config, Debug)]
pub struct LstmConfig {
    /// Input shape; inputs are flattened to `product(input_shape)` features
    pub input_shape: Vec<usize>,
    /// Number of hidden units in `h` and `c`
    pub num_units: usize,
    /// How multi-sample batches share one carried state
    pub merge_mode: MergeMode,
}

impl LstmConfig {
    /// Flattened input feature count
    pub fn input_size(&self) -> usize {
        self.input_shape.iter().product()
    }

    fn validate(&self) -> error::Result<()> {
        if self.input_shape.is_empty() || self.input_size() == 0 {
            return Err(StateError::config(format!(
                "input shape {:?} has no features",
                self.input_shape
            )));
        }
        if self.num_units == 0 {
            return Err(StateError::config("num_units must be positive"));
        }
        Ok(())
    }

    /// Build the layer around a fresh [`LSTMCell`]
    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<StatefulLstm<B>> {
        self.validate()?;
        let cell = LSTMCell::new(self.input_size(), self.num_units, device);
        self.init_with_cell(cell, device)
    }

    /// Build the layer around any cell matching the configured sizes
    pub fn init_with_cell<B: Backend, C: RecurrentCell<B>>(
        &self,
        cell: C,
        device: &B::Device,
    ) -> error::Result<StatefulLstm<B, C>> {
        self.validate()?;
        if cell.input_size() != self.input_size() || cell.hidden_size() != self.num_units {
            return Err(StateError::config(format!(
                "cell is {} -> {} but config expects {} -> {}",
                cell.input_size(),
                cell.hidden_size(),
                self.input_size(),
                self.num_units
            )));
        }

        Ok(StatefulLstm {
            cell,
            cache: StateCache::new(self.num_units, device),
            input_size: self.input_size(),
            num_units: self.num_units,
            merge_mode: self.merge_mode,
        })
    }
}

/// Row layout of one forward call, resolved from the tensor shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    timesteps: usize,
    num_sequences: usize,
    multi_sample: usize,
}

impl Layout {
    /// Input rows per timestep
    fn batch_total(&self) -> usize {
        self.num_sequences * self.multi_sample
    }
}

/// LSTM layer that owns its recurrent state between calls
///
/// Caller protocol per forward pass:
/// 1. [`get_state`](Self::get_state) with one episode-start flag per sequence
/// 2. [`forward`](Self::forward) with the input and the state from step 1 (or,
///    at train time, the per-timestep states and initials a replay buffer
///    collected from step 1)
///
/// Calls on one instance must be serialized; separate instances are independent.
#[derive(Debug)]
pub struct StatefulLstm<B: Backend, C = LSTMCell<B>> {
    cell: C,
    cache: StateCache<B>,
    input_size: usize,
    num_units: usize,
    merge_mode: MergeMode,
}

impl<B: Backend, C: RecurrentCell<B>> StatefulLstm<B, C> {
    /// Get the flattened input size
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Get the number of hidden units
    pub fn num_units(&self) -> usize {
        self.num_units
    }

    /// Get the multi-sample merge mode
    pub fn merge_mode(&self) -> MergeMode {
        self.merge_mode
    }

    /// Shape of one output row
    pub fn output_shape(&self) -> [usize; 1] {
        [self.num_units]
    }

    /// Whether the layer carries state between calls (always true)
    pub fn is_recurrent() -> bool {
        true
    }

    /// Device the cached state lives on
    pub fn device(&self) -> &B::Device {
        self.cache.device()
    }

    /// Get the wrapped cell
    pub fn cell(&self) -> &C {
        &self.cell
    }

    /// Replace the cell with `f(cell)`, keeping the cached state.
    ///
    /// Burn optimizers consume and return the module they update:
    ///
    /// ```ignore
    /// let grads = GradientsParams::from_grads(loss.backward(), lstm.cell());
    /// lstm = lstm.map_cell(|cell| optim.step(lr, cell, grads));
    /// ```
    pub fn map_cell<F: FnOnce(C) -> C>(self, f: F) -> Self {
        Self {
            cell: f(self.cell),
            ..self
        }
    }

    /// State persisted by the last forward pass (or masked by the last `get_state`)
    pub fn last_state(&self) -> Option<&HiddenState<B>> {
        self.cache.last_state()
    }

    /// Drop the cached state, e.g. when the actor's environments are rebuilt
    pub fn clear_state(&mut self) {
        self.cache.clear();
    }

    /// Fetch the state to feed into the next forward pass.
    ///
    /// `initials` has one entry per sequence, true where an episode starts at
    /// the first timestep of that pass. The very first call must flag every
    /// sequence.
    pub fn get_state(&mut self, initials: &[bool]) -> error::Result<StateSnapshot> {
        self.cache.get_state(initials)
    }

    /// Unroll the cell over `timesteps` and cache the final state.
    ///
    /// # Arguments
    /// * `x` - Input of any rank whose elements flatten to
    ///   `[timesteps * num_sequences * multi_sample, input_size]`, timestep-major,
    ///   samples of one sequence contiguous
    /// * `hx`, `cx` - Seed state, `[timesteps * num_sequences, num_units]`; only
    ///   the timestep-0 rows are read
    /// * `initials` - Episode-start flags, `[timesteps * num_sequences]`
    /// * `timesteps` - Number of timesteps in `x`
    ///
    /// `multi_sample` is derived as `x_rows / hx_rows`.
    ///
    /// # Returns
    /// The `h` output of every timestep, `[timesteps * num_sequences * multi_sample, num_units]`
    pub fn forward<const D: usize>(
        &mut self,
        x: Tensor<B, D>,
        hx: Tensor<B, 2>,
        cx: Tensor<B, 2>,
        initials: Tensor<B, 1>,
        timesteps: usize,
    ) -> error::Result<Tensor<B, 2>> {
        self.unroll(x, hx, cx, initials, timesteps, None)
    }

    /// Like [`forward`](Self::forward) with an explicit multi-sample factor.
    ///
    /// `hx`/`cx` may then hold either one row per sequence or one row per
    /// `(timestep, sequence)`. The factor is cross-checked against the shapes.
    pub fn forward_with_multi_sample<const D: usize>(
        &mut self,
        x: Tensor<B, D>,
        hx: Tensor<B, 2>,
        cx: Tensor<B, 2>,
        initials: Tensor<B, 1>,
        timesteps: usize,
        multi_sample: usize,
    ) -> error::Result<Tensor<B, 2>> {
        self.unroll(x, hx, cx, initials, timesteps, Some(multi_sample))
    }

    /// Single-timestep forward fed straight from a [`get_state`](Self::get_state) result
    pub fn forward_snapshot<const D: usize>(
        &mut self,
        x: Tensor<B, D>,
        snapshot: &StateSnapshot,
    ) -> error::Result<Tensor<B, 2>> {
        let device = self.device().clone();
        let (state, initials) = snapshot.to_tensors::<B>(&device)?;
        let (hx, cx) = state.into_parts();
        self.forward(x, hx, cx, initials, 1)
    }

    fn flatten<const D: usize>(&self, x: Tensor<B, D>) -> error::Result<Tensor<B, 2>> {
        let elements = x.shape().num_elements();
        if elements == 0 || elements % self.input_size != 0 {
            return Err(StateError::shape(format!(
                "input with {} elements does not flatten to rows of {} features",
                elements, self.input_size
            )));
        }
        Ok(x.reshape([elements / self.input_size, self.input_size]))
    }

    fn resolve_layout(
        &self,
        rows: usize,
        seed_dims: [usize; 2],
        initials_len: usize,
        timesteps: usize,
        multi_sample: Option<usize>,
    ) -> error::Result<Layout> {
        let [seed_rows, seed_units] = seed_dims;
        if seed_units != self.num_units {
            return Err(StateError::shape(format!(
                "seed state has {} units, expected {}",
                seed_units, self.num_units
            )));
        }
        if timesteps == 0 || rows % timesteps != 0 {
            return Err(StateError::shape(format!(
                "{} input rows cannot be split into {} timesteps",
                rows, timesteps
            )));
        }
        if seed_rows == 0 {
            return Err(StateError::shape("seed state has no rows"));
        }
        let batch_total = rows / timesteps;

        let derived = (rows % seed_rows == 0).then(|| rows / seed_rows);
        let explicit = multi_sample.is_some();
        let multi_sample = match multi_sample {
            Some(0) => return Err(StateError::shape("multi_sample must be at least 1")),
            Some(k) => k,
            None => derived.ok_or_else(|| {
                StateError::shape(format!(
                    "{} input rows are not a multiple of {} state rows",
                    rows, seed_rows
                ))
            })?,
        };
        if batch_total % multi_sample != 0 {
            return Err(StateError::shape(format!(
                "{} rows per timestep are not a multiple of multi_sample {}",
                batch_total, multi_sample
            )));
        }
        let num_sequences = batch_total / multi_sample;

        let per_timestep_seed = seed_rows == timesteps * num_sequences;
        // One row per sequence is only unambiguous when the caller named the factor
        let per_sequence_seed = explicit && seed_rows == num_sequences;
        if !per_timestep_seed && !per_sequence_seed {
            return Err(StateError::shape(format!(
                "seed state has {} rows; expected {} ({} timesteps x {} sequences), \
                 input/state ratio suggests multi_sample {:?}",
                seed_rows,
                timesteps * num_sequences,
                timesteps,
                num_sequences,
                derived
            )));
        }

        if initials_len != timesteps * num_sequences {
            return Err(StateError::shape(format!(
                "initials has {} entries, expected {} ({} timesteps x {} sequences)",
                initials_len,
                timesteps * num_sequences,
                timesteps,
                num_sequences
            )));
        }

        Ok(Layout {
            timesteps,
            num_sequences,
            multi_sample,
        })
    }

    fn unroll<const D: usize>(
        &mut self,
        x: Tensor<B, D>,
        hx: Tensor<B, 2>,
        cx: Tensor<B, 2>,
        initials: Tensor<B, 1>,
        timesteps: usize,
        multi_sample: Option<usize>,
    ) -> error::Result<Tensor<B, 2>> {
        let x = self.flatten(x)?;
        if hx.dims() != cx.dims() {
            return Err(StateError::shape(format!(
                "hx is {:?} but cx is {:?}",
                hx.dims(),
                cx.dims()
            )));
        }
        let [rows, _] = x.dims();
        let [initials_len] = initials.dims();
        let layout = self
            .resolve_layout(rows, hx.dims(), initials_len, timesteps, multi_sample)
            .map_err(|err| {
                warn!("rejected forward call: {}", err);
                err
            })?;
        let batch_total = layout.batch_total();
        let samples = layout.multi_sample;

        trace!(
            "unrolling {} timesteps: {} sequences x {} samples, merge mode {}",
            layout.timesteps,
            layout.num_sequences,
            samples,
            self.merge_mode
        );

        // Mid-sequence states are produced by the loop; only timestep 0 seeds it
        let mut state = HiddenState::new(
            hx.narrow(0, 0, layout.num_sequences),
            cx.narrow(0, 0, layout.num_sequences),
        );
        let initials = repeat_interleave_flags(initials, samples).reshape([layout.timesteps, batch_total]);

        let mut outputs: Vec<Tensor<B, 2>> = Vec::with_capacity(layout.timesteps);
        for t in 0..layout.timesteps {
            if samples > 1 && self.merge_mode.expands_at(t) {
                state = expand(state, samples);
            }

            let step_initials = initials.clone().narrow(0, t, 1).reshape([batch_total]);
            state = reset_episodes(state, step_initials);

            let step_input = x.clone().narrow(0, t * batch_total, batch_total);
            let (h, c) = self.cell.step(step_input, state.into_parts());
            if h.dims() != [batch_total, self.num_units] || c.dims() != h.dims() {
                return Err(StateError::shape(format!(
                    "cell returned h {:?} and c {:?}, expected [{}, {}]",
                    h.dims(),
                    c.dims(),
                    batch_total,
                    self.num_units
                )));
            }
            outputs.push(h.clone());
            state = HiddenState::new(h, c);

            if samples > 1 && self.merge_mode.reduces_at(t, layout.timesteps) {
                state = reduce(state, samples)?;
            }
        }

        self.cache.set_state(state)?;
        Ok(Tensor::cat(outputs, 0))
    }
}
