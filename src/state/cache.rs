use burn::tensor::backend::Backend;
use log::{debug, warn};
use ndarray::Array1;

use super::{flags_to_tensor, reset_episodes, HiddenState, StateSnapshot};
use crate::error::{Result, StateError};

/// Last known per-sequence state, carried between forward calls.
///
/// Starts empty. The first [`get_state`](StateCache::get_state) must flag every
/// sequence as an episode start and allocates zeros; afterwards the cache holds
/// whatever the last forward pass left behind.
#[derive(Debug, Clone)]
pub struct StateCache<B: Backend> {
    last: Option<HiddenState<B>>,
    num_units: usize,
    device: B::Device,
}

impl<B: Backend> StateCache<B> {
    pub fn new(num_units: usize, device: &B::Device) -> Self {
        Self {
            last: None,
            num_units,
            device: device.clone(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.last.is_some()
    }

    pub fn last_state(&self) -> Option<&HiddenState<B>> {
        self.last.as_ref()
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Forget the cached state; the next `get_state` must be all-initial again.
    pub fn clear(&mut self) {
        if self.last.take().is_some() {
            debug!("cleared cached recurrent state");
        }
    }

    /// State to feed into the next forward pass.
    ///
    /// `initials[i]` is true when sequence `i` starts a new episode at the first
    /// timestep of that pass; its rows are zeroed here and stay zeroed in the
    /// cache. The returned snapshot is a host copy.
    pub fn get_state(&mut self, initials: &[bool]) -> Result<StateSnapshot> {
        let batch_size = initials.len();
        if batch_size == 0 {
            return Err(StateError::shape("initials must cover at least one sequence"));
        }

        let state = match self.last.take() {
            Some(state) if state.rows() != batch_size => {
                let rows = state.rows();
                self.last = Some(state);
                warn!(
                    "get_state called for {} sequences but {} are cached",
                    batch_size, rows
                );
                return Err(StateError::shape(format!(
                    "cached state has {} rows, initials has {}",
                    rows, batch_size
                )));
            }
            Some(state) => state,
            None => {
                let non_initial = initials.iter().filter(|&&initial| !initial).count();
                if non_initial > 0 {
                    warn!(
                        "first get_state call with {} non-initial sequences",
                        non_initial
                    );
                    return Err(StateError::UninitializedStateMisuse {
                        non_initial,
                        batch_size,
                    });
                }
                debug!(
                    "initializing recurrent state cache: {} sequences x {} units",
                    batch_size, self.num_units
                );
                HiddenState::zeros(batch_size, self.num_units, &self.device)
            }
        };

        let masked = reset_episodes(state, flags_to_tensor(initials, &self.device));
        self.last = Some(masked.clone());
        let (hx, cx) = masked.to_arrays()?;

        Ok(StateSnapshot {
            hx,
            cx,
            initials: Array1::from_iter(initials.iter().map(|&i| if i { 1.0 } else { 0.0 })),
        })
    }

    /// Overwrite the cache with the final, one-row-per-sequence state of a pass.
    pub fn set_state(&mut self, state: HiddenState<B>) -> Result<()> {
        if state.num_units() != self.num_units || state.c.dims() != state.h.dims() {
            return Err(StateError::shape(format!(
                "expected h and c of width {}, got {:?} and {:?}",
                self.num_units,
                state.h.dims(),
                state.c.dims()
            )));
        }
        self.last = Some(state.detach());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Tensor, TensorData};
    use ndarray::Array2;

    type TestBackend = NdArray<f32>;

    fn filled(rows: usize, units: usize, value: f32) -> HiddenState<TestBackend> {
        let device = Default::default();
        HiddenState::new(
            Tensor::from_data(TensorData::new(vec![value; rows * units], [rows, units]), &device),
            Tensor::from_data(TensorData::new(vec![-value; rows * units], [rows, units]), &device),
        )
    }

    #[test]
    fn test_first_call_requires_all_initial() {
        let mut cache = StateCache::<TestBackend>::new(4, &Default::default());

        let err = cache.get_state(&[true, false, false]).unwrap_err();
        assert_eq!(
            err,
            StateError::UninitializedStateMisuse {
                non_initial: 2,
                batch_size: 3
            }
        );
        assert!(!cache.is_initialized());
    }

    #[test]
    fn test_first_call_allocates_zeros() {
        let mut cache = StateCache::<TestBackend>::new(4, &Default::default());

        let snapshot = cache.get_state(&[true, true]).unwrap();

        assert!(cache.is_initialized());
        assert_eq!(snapshot.hx, Array2::<f32>::zeros((2, 4)));
        assert_eq!(snapshot.cx, Array2::<f32>::zeros((2, 4)));
        assert_eq!(snapshot.initials.to_vec(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_initial_rows_are_masked_and_written_back() {
        let mut cache = StateCache::<TestBackend>::new(2, &Default::default());
        cache.set_state(filled(2, 2, 3.0)).unwrap();

        let snapshot = cache.get_state(&[false, true]).unwrap();
        assert_eq!(snapshot.hx.row(0).to_vec(), vec![3.0, 3.0]);
        assert_eq!(snapshot.hx.row(1).to_vec(), vec![0.0, 0.0]);
        assert_eq!(snapshot.cx.row(0).to_vec(), vec![-3.0, -3.0]);
        assert_eq!(snapshot.cx.row(1).to_vec(), vec![0.0, 0.0]);

        // The cache keeps the masked version
        let again = cache.get_state(&[false, false]).unwrap();
        assert_eq!(again.hx, snapshot.hx);
    }

    #[test]
    fn test_batch_size_must_match_cache() {
        let mut cache = StateCache::<TestBackend>::new(2, &Default::default());
        cache.set_state(filled(3, 2, 1.0)).unwrap();

        let err = cache.get_state(&[false, false]).unwrap_err();
        assert!(matches!(err, StateError::ShapeMismatch(_)));
        // Rejected call leaves the cache in place
        assert_eq!(cache.last_state().map(|s| s.rows()), Some(3));
    }

    #[test]
    fn test_set_state_rejects_wrong_width() {
        let mut cache = StateCache::<TestBackend>::new(2, &Default::default());
        assert!(cache.set_state(filled(1, 3, 1.0)).is_err());
        assert!(!cache.is_initialized());
    }

    #[test]
    fn test_clear_returns_to_uninitialized() {
        let mut cache = StateCache::<TestBackend>::new(2, &Default::default());
        cache.get_state(&[true]).unwrap();
        cache.clear();

        assert!(!cache.is_initialized());
        assert!(cache.get_state(&[false]).is_err());
    }

    #[test]
    fn test_empty_initials_rejected() {
        let mut cache = StateCache::<TestBackend>::new(2, &Default::default());
        assert!(matches!(
            cache.get_state(&[]),
            Err(StateError::ShapeMismatch(_))
        ));
    }
}
