use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::HiddenState;

/// Zero the state rows of sequences whose episode starts at this timestep.
///
/// `initials` holds one `0.0`/`1.0` flag per state row. Flagged rows of both
/// `h` and `c` become exactly zero (non-finite values included); every other
/// row passes through untouched.
pub fn reset_episodes<B: Backend>(state: HiddenState<B>, initials: Tensor<B, 1>) -> HiddenState<B> {
    let [rows, units] = state.h.dims();
    let mask = initials
        .greater_elem(0.5)
        .reshape([rows, 1])
        .repeat_dim(1, units);

    HiddenState::new(
        state.h.mask_fill(mask.clone(), 0.0),
        state.c.mask_fill(mask, 0.0),
    )
}
