//! # Stateful Recurrent Layers
//!
//! [`StatefulLstm`] drives a [`RecurrentCell`](crate::cells::RecurrentCell)
//! over flattened batches and keeps the recurrent state between calls.
//! **This is the primary API most users should use.**
//!
//! ## Caller Protocol
//!
//! ```ignore
//! let mut lstm = LstmConfig::new(vec![16], 64, MergeMode::Inner).init::<Backend>(&device)?;
//!
//! // Acting: one timestep per call
//! let snapshot = lstm.get_state(&episode_starts)?;   // [num_envs] flags
//! let out = lstm.forward_snapshot(obs, &snapshot)?;   // obs: [num_envs, 16]
//!
//! // Training: replay the stored snapshots over a sequence
//! let out = lstm.forward(x, hx, cx, initials, timesteps)?;
//! ```
//!
//! ## Tensor Shapes
//!
//! | Tensor | Shape |
//! |--------|-------|
//! | `x` | `[timesteps * num_sequences * multi_sample, input_size]` (any rank, flattened) |
//! | `hx`, `cx` | `[timesteps * num_sequences, num_units]` (timestep 0 is used) |
//! | `initials` | `[timesteps * num_sequences]`, `0.0` / `1.0` |
//! | output | `[timesteps * num_sequences * multi_sample, num_units]` |
//!
//! All row axes are timestep-major. Within a timestep, the `multi_sample`
//! variants of a sequence are contiguous.
//!
//! ## Multi-sample Merge Modes
//!
//! | Mode | Expand | Average |
//! |------|--------|---------|
//! | [`MergeMode::Outer`](crate::multi_sample::MergeMode::Outer) | before timestep 0 | after the last timestep |
//! | [`MergeMode::Inner`](crate::multi_sample::MergeMode::Inner) | before every timestep | after every timestep |
//!
//! With one timestep or `multi_sample == 1` the modes are identical.

pub mod lstm;

pub use lstm::{LstmConfig, StatefulLstm};
