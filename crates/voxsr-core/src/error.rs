//! Error types for patching operations.
//!
//! All failures in this workspace are caller contract violations surfaced
//! synchronously; there are no transient or retryable errors.

use thiserror::Error;

/// Main error type for patch extraction and reassembly.
#[derive(Error, Debug)]
pub enum PatchError {
    /// Invalid parameter combination supplied at call time.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Volume dimensions incompatible with the configured tiling arithmetic.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Tensor shape disagreement between co-registered inputs.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Random access past the end of a patch index.
    #[error("Patch index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Result type for patching operations.
pub type Result<T> = std::result::Result<T, PatchError>;

impl PatchError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }
}
