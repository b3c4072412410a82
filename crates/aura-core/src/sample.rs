//! Sample type abstraction and alignment helpers

use std::ops::{AddAssign, MulAssign, SubAssign};

use num_traits::Float;
use rustfft::FftNum;

/// Floating-point sample type processed by the engine.
///
/// Implemented for `f32` and `f64` only. The `From<f32>` bound gives exact
/// conversions for ramp constants and [`Gain`] values.
pub trait Sample:
    FftNum + Float + From<f32> + AddAssign + SubAssign + MulAssign + Default
{
}

impl Sample for f32 {}
impl Sample for f64 {}

/// Linear gain values are single precision regardless of the sample type.
pub type Gain = f32;

/// Round `size` up to the next multiple of `alignment` (in elements).
///
/// An alignment of 0 or 1 means no padding.
#[inline]
pub fn next_aligned_size(size: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        size
    } else {
        size.div_ceil(alignment) * alignment
    }
}

/// Whether `ptr` satisfies an alignment given as a number of elements.
#[inline]
pub fn is_aligned_to<T>(ptr: *const T, alignment: usize) -> bool {
    alignment <= 1 || (ptr as usize) % (alignment * std::mem::size_of::<T>()) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_aligned_size() {
        assert_eq!(next_aligned_size(5, 0), 5);
        assert_eq!(next_aligned_size(5, 1), 5);
        assert_eq!(next_aligned_size(5, 4), 8);
        assert_eq!(next_aligned_size(8, 4), 8);
        assert_eq!(next_aligned_size(0, 4), 0);
    }

    #[test]
    fn test_is_aligned_to() {
        let buf = crate::AlignedVector::<f32>::new(16, 8).unwrap();
        // Any pointer passes the trivial alignments.
        assert!(is_aligned_to(buf.as_ptr(), 0));
        assert!(is_aligned_to(buf.as_ptr(), 1));
        assert!(is_aligned_to(buf.as_ptr(), 8));
        // One element past an 8-aligned base cannot be 8-aligned.
        assert!(!is_aligned_to(&buf[1] as *const f32, 8));
    }
}
