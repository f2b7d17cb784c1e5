//! Error types for the recurrent state controller.
//!
//! Every variant is a precondition violation in the calling code. Nothing here
//! is transient, so nothing is retried.

use thiserror::Error;

/// Errors raised by [`StatefulLstm`](crate::rnn::StatefulLstm) and its helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// `get_state` was called before any state existed while some sequences
    /// were not flagged as episode starts.
    #[error(
        "state cache is uninitialized: all sequences must be initial on the first call \
         ({non_initial} of {batch_size} were not)"
    )]
    UninitializedStateMisuse {
        non_initial: usize,
        batch_size: usize,
    },

    /// Row, batch or width divisibility invariants were violated.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The layer was configured with values it cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl StateError {
    /// Creates a shape mismatch error.
    pub fn shape(message: impl Into<String>) -> Self {
        StateError::ShapeMismatch(message.into())
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        StateError::InvalidConfiguration(message.into())
    }
}

impl From<ndarray::ShapeError> for StateError {
    fn from(err: ndarray::ShapeError) -> Self {
        StateError::ShapeMismatch(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StateError::UninitializedStateMisuse {
            non_initial: 2,
            batch_size: 4,
        };
        assert!(err.to_string().contains("2 of 4"));

        let err = StateError::shape("6 rows not divisible by 4");
        assert_eq!(err.to_string(), "shape mismatch: 6 rows not divisible by 4");

        let err = StateError::config("unknown merge mode 'both'");
        assert!(err.to_string().starts_with("invalid configuration"));
    }

    #[test]
    fn test_ndarray_shape_error_converts() {
        let err = ndarray::Array2::<f32>::from_shape_vec((2, 3), vec![0.0; 5]).unwrap_err();
        let err: StateError = err.into();
        assert!(matches!(err, StateError::ShapeMismatch(_)));
    }
}
