//! Real-to-complex FFT wrappers
//!
//! The convolution core talks to a small trait with explicit scaling
//! constants so any transform convention works: the engine folds
//! `1 / (forward_scale * inverse_scale * N)` into the stored filters and
//! stays unity-gain regardless of the back-end. Back-ends are created by
//! name; `"default"` is always present.

use std::sync::Arc;

use aura_core::{AlignedVector, Sample};
use num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner};

use crate::{ConvolverError, ConvolverResult};

/// A real-to-complex transform pair of a fixed size.
///
/// `forward` consumes `size` real samples and produces `size / 2 + 1`
/// complex bins; `inverse` is the reverse. For any real input `x`,
/// `inverse(forward(x)) == forward_scale() * inverse_scale() * size * x`.
pub trait FftBackend<S: Sample>: Send {
    /// Transform size (number of real samples per forward call).
    fn size(&self) -> usize;

    fn forward(&mut self, input: &[S], output: &mut [Complex<S>]) -> ConvolverResult<()>;

    fn inverse(&mut self, input: &[Complex<S>], output: &mut [S]) -> ConvolverResult<()>;

    fn forward_scale(&self) -> S;

    fn inverse_scale(&self) -> S;
}

fn check_size(size: usize) -> ConvolverResult<usize> {
    if size < 2 || size % 2 != 0 {
        return Err(ConvolverError::InvalidArgument(format!(
            "FFT size must be even and at least 2, got {size}"
        )));
    }
    Ok(size / 2 + 1)
}

fn check_lengths(actual_in: usize, expect_in: usize, actual_out: usize, expect_out: usize) -> ConvolverResult<()> {
    if actual_in != expect_in || actual_out != expect_out {
        return Err(ConvolverError::InvalidArgument(format!(
            "FFT buffer lengths {actual_in}/{actual_out} do not match transform {expect_in}/{expect_out}"
        )));
    }
    Ok(())
}

// ============ realfft Back-End ============

/// Split-radix real FFT via the `realfft` crate. Unnormalised in both
/// directions (`forward_scale == inverse_scale == 1`).
pub struct RealFftBackend<S: Sample> {
    size: usize,
    bins: usize,
    r2c: Arc<dyn RealToComplex<S>>,
    c2r: Arc<dyn ComplexToReal<S>>,
    real_scratch: AlignedVector<S>,
    complex_scratch: AlignedVector<Complex<S>>,
    fft_scratch: AlignedVector<Complex<S>>,
}

impl<S: Sample> RealFftBackend<S> {
    pub fn new(size: usize, alignment: usize) -> ConvolverResult<Self> {
        let bins = check_size(size)?;
        let mut planner = RealFftPlanner::<S>::new();
        let r2c = planner.plan_fft_forward(size);
        let c2r = planner.plan_fft_inverse(size);
        let scratch_len = r2c.get_scratch_len().max(c2r.get_scratch_len());
        log::debug!("realfft backend created, size {size}");
        Ok(Self {
            size,
            bins,
            r2c,
            c2r,
            real_scratch: AlignedVector::new(size, alignment.max(1) * 2)?,
            complex_scratch: AlignedVector::new(bins, alignment)?,
            fft_scratch: AlignedVector::new(scratch_len, alignment)?,
        })
    }
}

impl<S: Sample> FftBackend<S> for RealFftBackend<S> {
    fn size(&self) -> usize {
        self.size
    }

    fn forward(&mut self, input: &[S], output: &mut [Complex<S>]) -> ConvolverResult<()> {
        check_lengths(input.len(), self.size, output.len(), self.bins)?;
        // realfft consumes its input buffer, so transform a copy.
        self.real_scratch.as_mut_slice().copy_from_slice(input);
        self.r2c
            .process_with_scratch(
                self.real_scratch.as_mut_slice(),
                output,
                self.fft_scratch.as_mut_slice(),
            )
            .map_err(|e| ConvolverError::Fft(e.to_string()))
    }

    fn inverse(&mut self, input: &[Complex<S>], output: &mut [S]) -> ConvolverResult<()> {
        check_lengths(input.len(), self.bins, output.len(), self.size)?;
        self.complex_scratch.as_mut_slice().copy_from_slice(input);
        // DC and Nyquist are mathematically real for our spectra; clear
        // the rounding residue realfft would reject.
        let scratch = self.complex_scratch.as_mut_slice();
        scratch[0].im = S::zero();
        let last = self.bins - 1;
        scratch[last].im = S::zero();
        self.c2r
            .process_with_scratch(
                self.complex_scratch.as_mut_slice(),
                output,
                self.fft_scratch.as_mut_slice(),
            )
            .map_err(|e| ConvolverError::Fft(e.to_string()))
    }

    fn forward_scale(&self) -> S {
        S::one()
    }

    fn inverse_scale(&self) -> S {
        S::one()
    }
}

// ============ rustfft Back-End ============

/// Full complex FFT via `rustfft` with hermitian packing. Slower than the
/// real-input planner, mainly useful as an independent reference for the
/// scaling contract.
pub struct RustFftBackend<S: Sample> {
    size: usize,
    bins: usize,
    forward: Arc<dyn Fft<S>>,
    inverse: Arc<dyn Fft<S>>,
    buffer: AlignedVector<Complex<S>>,
    scratch: AlignedVector<Complex<S>>,
}

impl<S: Sample> RustFftBackend<S> {
    pub fn new(size: usize, alignment: usize) -> ConvolverResult<Self> {
        let bins = check_size(size)?;
        let mut planner = FftPlanner::<S>::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        log::debug!("rustfft backend created, size {size}");
        Ok(Self {
            size,
            bins,
            forward,
            inverse,
            buffer: AlignedVector::new(size, alignment)?,
            scratch: AlignedVector::new(scratch_len, alignment)?,
        })
    }
}

impl<S: Sample> FftBackend<S> for RustFftBackend<S> {
    fn size(&self) -> usize {
        self.size
    }

    fn forward(&mut self, input: &[S], output: &mut [Complex<S>]) -> ConvolverResult<()> {
        check_lengths(input.len(), self.size, output.len(), self.bins)?;
        for (slot, &x) in self.buffer.as_mut_slice().iter_mut().zip(input) {
            *slot = Complex::new(x, S::zero());
        }
        self.forward
            .process_with_scratch(self.buffer.as_mut_slice(), self.scratch.as_mut_slice());
        output.copy_from_slice(&self.buffer.as_slice()[..self.bins]);
        Ok(())
    }

    fn inverse(&mut self, input: &[Complex<S>], output: &mut [S]) -> ConvolverResult<()> {
        check_lengths(input.len(), self.bins, output.len(), self.size)?;
        let buffer = self.buffer.as_mut_slice();
        buffer[..self.bins].copy_from_slice(input);
        // Reconstruct the upper half from hermitian symmetry.
        for k in self.bins..self.size {
            buffer[k] = buffer[self.size - k].conj();
        }
        self.inverse
            .process_with_scratch(self.buffer.as_mut_slice(), self.scratch.as_mut_slice());
        for (out, bin) in output.iter_mut().zip(self.buffer.as_slice()) {
            *out = bin.re;
        }
        Ok(())
    }

    fn forward_scale(&self) -> S {
        S::one()
    }

    fn inverse_scale(&self) -> S {
        S::one()
    }
}

// ============ Named Factory ============

/// The back-end names `create_fft_backend` accepts.
pub fn available_backends() -> &'static [&'static str] {
    &["default", "realfft", "rustfft"]
}

/// Create an FFT back-end by name.
///
/// `"default"` always exists; unknown names fail with `InvalidArgument`.
/// `alignment` is the guaranteed alignment of transform buffers, in
/// complex elements.
pub fn create_fft_backend<S: Sample>(
    name: &str,
    size: usize,
    alignment: usize,
) -> ConvolverResult<Box<dyn FftBackend<S>>> {
    match name.to_ascii_lowercase().as_str() {
        "default" | "realfft" => Ok(Box::new(RealFftBackend::<S>::new(size, alignment)?)),
        "rustfft" => Ok(Box::new(RustFftBackend::<S>::new(size, alignment)?)),
        other => Err(ConvolverError::InvalidArgument(format!(
            "unknown FFT backend '{other}'"
        ))),
    }
}

/// `1 / (forward_scale * inverse_scale * N)`: pre-applied to stored
/// filters so the analysis/synthesis round trip has unit gain.
pub fn filter_scaling_factor<S: Sample>(backend: &dyn FftBackend<S>) -> S {
    let n = S::from_usize(backend.size()).expect("FFT size is representable as a sample");
    S::one() / (backend.forward_scale() * backend.inverse_scale() * n)
}
