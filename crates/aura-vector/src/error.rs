//! Error codes reported by the vector kernels

use thiserror::Error;

/// Failure modes of an elementwise vector operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// An argument buffer violates the declared element alignment
    /// (checked in debug builds).
    #[error("buffer violates the declared alignment")]
    Alignment,

    /// The operation failed internally.
    #[error("arithmetic failure in vector primitive")]
    Arithmetic,

    /// The operation was called with inconsistent parameters
    /// (mismatched lengths, degenerate ramp).
    #[error("invalid vector operation parameters")]
    Logic,
}

/// Result type alias
pub type KernelResult<T> = Result<T, KernelError>;
