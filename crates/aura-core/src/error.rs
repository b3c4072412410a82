//! Error types for the core storage primitives

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("allocation of {0} bytes failed")]
    Allocation(usize),
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
