//! Error types for the convolver family

use aura_core::CoreError;
use aura_vector::KernelError;
use thiserror::Error;

/// Convolver error type
#[derive(Error, Debug)]
pub enum ConvolverError {
    /// Construction-time or mutator-time misuse; the engine state is
    /// unchanged.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A vector primitive failed inside `process()`.
    #[error("vector kernel failure: {0}")]
    Kernel(#[from] KernelError),

    /// The FFT back-end reported a failure.
    #[error("FFT backend failure: {0}")]
    Fft(String),

    /// An internal invariant was violated.
    #[error("internal invariant violated: {0}")]
    Logic(String),
}

impl From<CoreError> for ConvolverError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidArgument(msg) => ConvolverError::InvalidArgument(msg),
            CoreError::Allocation(bytes) => {
                ConvolverError::InvalidArgument(format!("allocation of {bytes} bytes failed"))
            }
        }
    }
}

/// Result type alias
pub type ConvolverResult<T> = Result<T, ConvolverError>;
