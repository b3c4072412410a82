//! Reinterpretation between complex bins and their interleaved real view
//!
//! The frequency-domain filter store is manipulated with real-valued
//! kernels of twice the length (weighted filter sums scale re and im by
//! the same real factor). `num_complex::Complex` is `repr(C)` with the
//! real part first, so a complex slice is layout-compatible with a real
//! slice of twice the length.

use aura_core::Sample;
use num_complex::Complex;

/// View a complex slice as interleaved `[re, im, re, im, ...]` reals.
pub fn complex_as_real<S: Sample>(data: &[Complex<S>]) -> &[S] {
    // Safety: Complex<S> is repr(C) { re: S, im: S }.
    unsafe { std::slice::from_raw_parts(data.as_ptr().cast::<S>(), data.len() * 2) }
}

/// Mutable interleaved real view of a complex slice.
pub fn complex_as_real_mut<S: Sample>(data: &mut [Complex<S>]) -> &mut [S] {
    // Safety: as above; the lengths cover exactly the same memory.
    unsafe { std::slice::from_raw_parts_mut(data.as_mut_ptr().cast::<S>(), data.len() * 2) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_share_memory() {
        let mut bins = [Complex::new(1.0f32, 2.0), Complex::new(3.0, 4.0)];
        assert_eq!(complex_as_real(&bins), &[1.0, 2.0, 3.0, 4.0]);
        complex_as_real_mut(&mut bins)[3] = -4.0;
        assert_eq!(bins[1], Complex::new(3.0, -4.0));
    }
}
