//! Multi-sample state reconciliation.
//!
//! A multi-sample batch carries `k` stochastic variants of every sequence
//! (quantile samples, ensemble members), grouped contiguously on the batch
//! axis: rows `[i*k, (i+1)*k)` all belong to sequence `i`. The recurrent state
//! is kept at one row per sequence, so it has to be expanded to meet the
//! oversampled input and averaged back down afterwards.

use std::fmt;
use std::str::FromStr;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StateError};
use crate::state::HiddenState;

/// When oversampled state is expanded from and merged back to one row per sequence.
///
/// Both policies are equivalent when `multi_sample == 1`, and also when only a
/// single timestep is unrolled (acting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Expand before the first timestep and average after the last one.
    /// Intermediate timesteps carry the expanded state.
    Outer,
    /// Expand and average around every timestep, so every sample of a
    /// sequence enters each timestep with the same state.
    Inner,
}

impl MergeMode {
    /// Whether the carried state is expanded before `timestep`.
    pub fn expands_at(self, timestep: usize) -> bool {
        timestep == 0 || self == MergeMode::Inner
    }

    /// Whether the carried state is averaged after `timestep`.
    pub fn reduces_at(self, timestep: usize, timesteps: usize) -> bool {
        timestep + 1 == timesteps || self == MergeMode::Inner
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MergeMode::Outer => "outer",
            MergeMode::Inner => "inner",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMode {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "outer" => Ok(MergeMode::Outer),
            "inner" => Ok(MergeMode::Inner),
            other => Err(StateError::config(format!(
                "unknown multi-sample merge mode '{}', expected 'outer' or 'inner'",
                other
            ))),
        }
    }
}

/// Interleaved repeat of the rows of a 2D tensor.
///
/// Row `i` of the input becomes rows `[i*repeats, (i+1)*repeats)` of the output.
/// This is not tiling: `[a, b]` repeated twice is `[a, a, b, b]`.
pub fn repeat_interleave<B: Backend>(tensor: Tensor<B, 2>, repeats: usize) -> Tensor<B, 2> {
    if repeats == 1 {
        return tensor;
    }
    let [rows, width] = tensor.dims();
    tensor
        .reshape([rows, 1, width])
        .repeat_dim(1, repeats)
        .reshape([rows * repeats, width])
}

/// Interleaved repeat of a 1D flag vector, `[a, b]` -> `[a, a, b, b]` for `repeats == 2`.
pub fn repeat_interleave_flags<B: Backend>(flags: Tensor<B, 1>, repeats: usize) -> Tensor<B, 1> {
    if repeats == 1 {
        return flags;
    }
    let [len] = flags.dims();
    flags
        .reshape([len, 1])
        .repeat_dim(1, repeats)
        .reshape([len * repeats])
}

/// Average every group of `factor` consecutive rows into one row.
pub fn mean_groups<B: Backend>(tensor: Tensor<B, 2>, factor: usize) -> Result<Tensor<B, 2>> {
    let [rows, width] = tensor.dims();
    if factor == 0 || rows % factor != 0 {
        return Err(StateError::shape(format!(
            "cannot merge {} rows in groups of {}",
            rows, factor
        )));
    }
    if factor == 1 {
        return Ok(tensor);
    }
    let groups = rows / factor;
    Ok(tensor
        .reshape([groups, factor, width])
        .mean_dim(1)
        .reshape([groups, width]))
}

/// Expand a per-sequence state to `factor` samples per sequence.
pub fn expand<B: Backend>(state: HiddenState<B>, factor: usize) -> HiddenState<B> {
    HiddenState::new(
        repeat_interleave(state.h, factor),
        repeat_interleave(state.c, factor),
    )
}

/// Merge an oversampled state back to one row per sequence by averaging the
/// samples of each sequence. Inverse of [`expand`].
pub fn reduce<B: Backend>(state: HiddenState<B>, factor: usize) -> Result<HiddenState<B>> {
    Ok(HiddenState::new(
        mean_groups(state.h, factor)?,
        mean_groups(state.c, factor)?,
    ))
}
