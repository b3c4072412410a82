//! aura-convolver: real-time partitioned MIMO FIR convolution
//!
//! The AuraForge rendering core: uniformly partitioned frequency-domain
//! (overlap-save) convolution between arbitrary input and output channel
//! sets, for binaural/HRTF rendering and matrix convolution.
//!
//! ## Engine family
//! - `CoreConvolver` - FDL + filter bank, the per-block algorithm
//! - `MultichannelConvolver` - sparse input->output routing on top
//! - `CrossfadingConvolver` - twin filter banks with equal-gain fades
//! - `InterpolatingConvolver` - weighted filter combinations per route
//!
//! ## Support
//! - `fft` - real-to-complex FFT back-ends behind a named factory
//! - `GainFader` - precomputed linear gain ramps per channel
//! - `BlockAdapter` - arbitrary host frame counts over the fixed block
//!
//! No allocation happens inside `process()`; all state is sized at
//! construction. One instance is driven from one thread; parameter
//! updates must be serialised with `process()` by the host.

pub mod fft;

mod adapter;
mod core;
mod crossfade;
mod error;
mod fader;
mod interpolate;
mod multichannel;
mod routing;

pub use adapter::{BlockAdapter, BlockProcessor};
pub use self::core::{dft_bins, dft_bins_padded, dft_size, partition_count, CoreConvolver};
pub use crossfade::CrossfadingConvolver;
pub use error::{ConvolverError, ConvolverResult};
pub use fader::GainFader;
pub use interpolate::{
    InterpolatingConvolver, InterpolationParameter, InterpolationParameterSet, INVALID_INDEX,
};
pub use multichannel::MultichannelConvolver;
pub use routing::{FilterRouting, RouteParams, RoutingList, RoutingTable};
