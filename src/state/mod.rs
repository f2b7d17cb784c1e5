//! # Recurrent State
//!
//! Containers for the `(h, c)` pair and the per-instance cache that carries it
//! across forward calls.
//!
//! - [`HiddenState`]: backend tensors, `[num_sequences, num_units]` each
//! - [`StateSnapshot`]: host copy handed to the caller by `get_state`
//! - [`StateCache`]: lazily initialized `Option<HiddenState>` with the
//!   episode-aware zeroing applied on every read
//! - [`reset_episodes`]: zeroes rows flagged as episode starts

pub mod cache;
pub mod hidden;
pub mod reset;

pub use cache::StateCache;
pub use hidden::{flags_to_tensor, HiddenState, StateSnapshot};
pub use reset::reset_episodes;
