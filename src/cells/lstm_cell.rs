use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::RecurrentCell;

/// Standard LSTM cell, the default transition for [`StatefulLstm`](crate::rnn::StatefulLstm)
///
/// Implements the usual gate equations on the concatenated pre-activation
/// `z = W_x @ x + b_x + W_h @ h + b_h`, split into four chunks:
/// - i = sigmoid(z_i)
/// - f = sigmoid(z_f)
/// - g = tanh(z_g)
/// - o = sigmoid(z_o)
/// - c' = f * c + i * g
/// - h' = o * tanh(c')
#[derive(Module, Debug)]
pub struct LSTMCell<B: Backend> {
    input_size: usize,
    hidden_size: usize,
    input_map: Linear<B>,     // input -> 4 * hidden_size
    recurrent_map: Linear<B>, // hidden -> 4 * hidden_size
}

impl<B: Backend> LSTMCell<B> {
    /// Create a new LSTM cell
    ///
    /// # Arguments
    /// * `input_size` - Size of the (flattened) input features
    /// * `hidden_size` - Number of hidden units
    /// * `device` - Device to create the module on
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        let input_map = LinearConfig::new(input_size, 4 * hidden_size)
            .with_bias(true)
            .init(device);

        let recurrent_map = LinearConfig::new(hidden_size, 4 * hidden_size)
            .with_bias(true)
            .init(device);

        Self {
            input_size,
            hidden_size,
            input_map,
            recurrent_map,
        }
    }

    /// Get the input size
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Get the hidden size
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Run one timestep
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape `[batch_size, input_size]`
    /// * `states` - Tuple of (hidden_state, cell_state), each of shape `[batch_size, hidden_size]`
    ///
    /// # Returns
    /// Tuple of (new_hidden_state, new_cell_state)
    pub fn forward(
        &self,
        input: Tensor<B, 2>,
        states: (Tensor<B, 2>, Tensor<B, 2>),
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let (hidden_state, cell_state) = states;

        let z = self.input_map.forward(input) + self.recurrent_map.forward(hidden_state);

        let chunks = z.chunk(4, 1);
        let input_gate = activation::sigmoid(chunks[0].clone());
        let forget_gate = activation::sigmoid(chunks[1].clone());
        let candidate = chunks[2].clone().tanh();
        let output_gate = activation::sigmoid(chunks[3].clone());

        let new_cell = cell_state * forget_gate + input_gate * candidate;
        let new_hidden = new_cell.clone().tanh() * output_gate;

        (new_hidden, new_cell)
    }
}

impl<B: Backend> RecurrentCell<B> for LSTMCell<B> {
    fn step(
        &self,
        input: Tensor<B, 2>,
        state: (Tensor<B, 2>, Tensor<B, 2>),
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        self.forward(input, state)
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::backend::Backend as BurnBackend;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;
    type TestDevice = <TestBackend as BurnBackend>::Device;

    fn get_test_device() -> TestDevice {
        Default::default()
    }

    #[test]
    fn test_lstm_cell_creation() {
        let device = get_test_device();
        let cell = LSTMCell::<TestBackend>::new(20, 50, &device);

        assert_eq!(cell.input_size(), 20);
        assert_eq!(cell.hidden_size(), 50);
        assert_eq!(RecurrentCell::<TestBackend>::hidden_size(&cell), 50);
    }

    #[test]
    fn test_lstm_forward_shapes() {
        let device = get_test_device();
        let cell = LSTMCell::<TestBackend>::new(20, 50, &device);

        for batch_size in [1, 4, 16] {
            let input = Tensor::<TestBackend, 2>::zeros([batch_size, 20], &device);
            let h = Tensor::<TestBackend, 2>::zeros([batch_size, 50], &device);
            let c = Tensor::<TestBackend, 2>::zeros([batch_size, 50], &device);

            let (new_h, new_c) = cell.step(input, (h, c));

            assert_eq!(new_h.dims(), [batch_size, 50]);
            assert_eq!(new_c.dims(), [batch_size, 50]);
        }
    }

    #[test]
    fn test_lstm_hidden_is_bounded() {
        let device = get_test_device();
        let cell = LSTMCell::<TestBackend>::new(10, 20, &device);

        let input = Tensor::<TestBackend, 2>::random([3, 10], Distribution::Uniform(-5.0, 5.0), &device);
        let h = Tensor::<TestBackend, 2>::zeros([3, 20], &device);
        let c = Tensor::<TestBackend, 2>::ones([3, 20], &device) * 10.0;

        let (new_h, _) = cell.forward(input, (h, c));

        // h' = o * tanh(c') is always within (-1, 1)
        let max_abs: f32 = new_h.abs().max().into_scalar();
        assert!(max_abs <= 1.0);
    }

    #[test]
    fn test_lstm_identical_rows_stay_identical() {
        let device = get_test_device();
        let cell = LSTMCell::<TestBackend>::new(4, 6, &device);

        let row = Tensor::<TestBackend, 2>::random([1, 4], Distribution::Uniform(-1.0, 1.0), &device);
        let input = Tensor::cat(vec![row.clone(), row.clone(), row], 0);
        let h = Tensor::<TestBackend, 2>::zeros([3, 6], &device);
        let c = Tensor::<TestBackend, 2>::zeros([3, 6], &device);

        let (new_h, _) = cell.forward(input, (h, c));
        let first = new_h.clone().narrow(0, 0, 1);
        for i in 1..3 {
            let diff: f32 = (new_h.clone().narrow(0, i, 1) - first.clone())
                .abs()
                .sum()
                .into_scalar();
            assert!(diff < 1e-6);
        }
    }
}
