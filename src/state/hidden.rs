use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::{Array1, Array2};

use crate::error::{Result, StateError};

/// LSTM recurrent state: short-term `h` and carry `c`, each `[rows, num_units]`
#[derive(Debug, Clone)]
pub struct HiddenState<B: Backend> {
    pub h: Tensor<B, 2>,
    pub c: Tensor<B, 2>,
}

impl<B: Backend> HiddenState<B> {
    pub fn new(h: Tensor<B, 2>, c: Tensor<B, 2>) -> Self {
        Self { h, c }
    }

    /// All-zero state for `rows` sequences
    pub fn zeros(rows: usize, num_units: usize, device: &B::Device) -> Self {
        Self {
            h: Tensor::zeros([rows, num_units], device),
            c: Tensor::zeros([rows, num_units], device),
        }
    }

    /// Number of state rows
    pub fn rows(&self) -> usize {
        self.h.dims()[0]
    }

    /// Width of `h` and `c`
    pub fn num_units(&self) -> usize {
        self.h.dims()[1]
    }

    /// Drop the autodiff graph behind both tensors
    pub fn detach(self) -> Self {
        Self {
            h: self.h.detach(),
            c: self.c.detach(),
        }
    }

    pub fn into_parts(self) -> (Tensor<B, 2>, Tensor<B, 2>) {
        (self.h, self.c)
    }

    /// Build a state from host arrays
    pub fn from_arrays(h: &Array2<f32>, c: &Array2<f32>, device: &B::Device) -> Result<Self> {
        if h.dim() != c.dim() {
            return Err(StateError::shape(format!(
                "h is {:?} but c is {:?}",
                h.dim(),
                c.dim()
            )));
        }
        Ok(Self {
            h: array_to_tensor(h, device),
            c: array_to_tensor(c, device),
        })
    }

    /// Copy both tensors to host arrays
    pub fn to_arrays(&self) -> Result<(Array2<f32>, Array2<f32>)> {
        Ok((
            tensor_to_array(self.h.clone())?,
            tensor_to_array(self.c.clone())?,
        ))
    }
}

/// Host-side copy of the cached state, as handed out by `get_state`.
///
/// `initials` holds the caller's episode-start flags as `0.0`/`1.0`; they are
/// fed back to `forward` so the first unrolled timestep resets the same rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub hx: Array2<f32>,
    pub cx: Array2<f32>,
    pub initials: Array1<f32>,
}

impl StateSnapshot {
    /// Number of sequences in the snapshot
    pub fn batch_size(&self) -> usize {
        self.initials.len()
    }

    /// Move the snapshot onto a device as `(state, initials)`
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> Result<(HiddenState<B>, Tensor<B, 1>)> {
        let state = HiddenState::from_arrays(&self.hx, &self.cx, device)?;
        let initials = Tensor::from_data(
            TensorData::new(self.initials.to_vec(), [self.initials.len()]),
            device,
        );
        Ok((state, initials))
    }
}

/// Episode-start flags as a `0.0`/`1.0` float vector
pub fn flags_to_tensor<B: Backend>(flags: &[bool], device: &B::Device) -> Tensor<B, 1> {
    let values: Vec<f32> = flags.iter().map(|&f| if f { 1.0 } else { 0.0 }).collect();
    Tensor::from_data(TensorData::new(values, [flags.len()]), device)
}

fn array_to_tensor<B: Backend>(array: &Array2<f32>, device: &B::Device) -> Tensor<B, 2> {
    let (rows, cols) = array.dim();
    // iter() walks in logical row-major order regardless of memory layout
    let values: Vec<f32> = array.iter().copied().collect();
    Tensor::from_data(TensorData::new(values, [rows, cols]), device)
}

fn tensor_to_array<B: Backend>(tensor: Tensor<B, 2>) -> Result<Array2<f32>> {
    let [rows, cols] = tensor.dims();
    let values: Vec<f32> = tensor.into_data().iter::<f32>().collect();
    Ok(Array2::from_shape_vec((rows, cols), values)?)
}
