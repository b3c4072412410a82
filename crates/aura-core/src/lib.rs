//! aura-core: shared foundation for the AuraForge convolution engine
//!
//! Provides the types every other crate builds on:
//! - `Sample` - the floating-point sample abstraction (f32/f64)
//! - `AlignedVector` / `AlignedMatrix` - SIMD-aligned numeric storage
//! - `CircularBuffer` - multichannel ring buffer with contiguous read-back

mod buffer;
mod error;
mod ring;
mod sample;

pub use buffer::*;
pub use error::*;
pub use ring::*;
pub use sample::*;
