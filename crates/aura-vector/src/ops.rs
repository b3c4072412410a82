//! Public vector operations
//!
//! Thin wrappers over the active kernel table: they validate lengths,
//! enforce the declared element alignment in debug builds, and route the
//! arithmetic to whichever back-end is installed. The alignment argument
//! is given in elements (complex elements for the `complex_*` group); 0
//! or 1 means no guarantee.

use aura_core::{is_aligned_to, Sample};
use num_complex::Complex;

use crate::dispatch::KernelSample;
use crate::{kernels, KernelError, KernelResult};

#[inline]
fn aligned<T>(ptr: *const T, alignment: usize) -> KernelResult<()> {
    #[cfg(debug_assertions)]
    if !is_aligned_to(ptr, alignment) {
        return Err(KernelError::Alignment);
    }
    #[cfg(not(debug_assertions))]
    let _ = (ptr, alignment);
    Ok(())
}

#[inline]
fn same_len(len: usize, expected: usize) -> KernelResult<()> {
    if len == expected {
        Ok(())
    } else {
        Err(KernelError::Logic)
    }
}

// ============ Initialisation ============

pub fn zero<T: Copy + Default>(dst: &mut [T], alignment: usize) -> KernelResult<()> {
    aligned(dst.as_ptr(), alignment)?;
    kernels::zero(dst);
    Ok(())
}

pub fn fill<T: Copy>(value: T, dst: &mut [T], alignment: usize) -> KernelResult<()> {
    aligned(dst.as_ptr(), alignment)?;
    kernels::fill(value, dst);
    Ok(())
}

pub fn copy<T: Copy>(src: &[T], dst: &mut [T], alignment: usize) -> KernelResult<()> {
    same_len(src.len(), dst.len())?;
    aligned(src.as_ptr(), alignment)?;
    aligned(dst.as_ptr(), alignment)?;
    kernels::copy(src, dst);
    Ok(())
}

/// Linear ramp over the whole destination; fewer than two samples is a
/// logic error.
pub fn ramp<S: Sample>(
    dst: &mut [S],
    start: S,
    end: S,
    inc_start: bool,
    inc_end: bool,
    alignment: usize,
) -> KernelResult<()> {
    if dst.len() < 2 {
        return Err(KernelError::Logic);
    }
    aligned(dst.as_ptr(), alignment)?;
    kernels::ramp(dst, start, end, inc_start, inc_end);
    Ok(())
}

// ============ Addition / subtraction ============

pub fn add<S: KernelSample>(a: &[S], b: &[S], y: &mut [S], alignment: usize) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    same_len(b.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(b.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().add)(a, b, y);
    Ok(())
}

pub fn add_inplace<S: KernelSample>(a: &[S], y: &mut [S], alignment: usize) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().add_inplace)(a, y);
    Ok(())
}

pub fn add_const<S: Sample>(c: S, a: &[S], y: &mut [S], alignment: usize) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    kernels::add_const(c, a, y);
    Ok(())
}

pub fn add_const_inplace<S: Sample>(c: S, y: &mut [S], alignment: usize) -> KernelResult<()> {
    aligned(y.as_ptr(), alignment)?;
    kernels::add_const_inplace(c, y);
    Ok(())
}

/// `y = a - b`
pub fn subtract<S: KernelSample>(
    a: &[S],
    b: &[S],
    y: &mut [S],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    same_len(b.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(b.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().subtract)(a, b, y);
    Ok(())
}

/// `y -= a`
pub fn subtract_inplace<S: KernelSample>(
    a: &[S],
    y: &mut [S],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().subtract_inplace)(a, y);
    Ok(())
}

/// `y = a - c`
pub fn subtract_const<S: Sample>(c: S, a: &[S], y: &mut [S], alignment: usize) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    kernels::subtract_const(c, a, y);
    Ok(())
}

pub fn subtract_const_inplace<S: Sample>(c: S, y: &mut [S], alignment: usize) -> KernelResult<()> {
    aligned(y.as_ptr(), alignment)?;
    kernels::subtract_const_inplace(c, y);
    Ok(())
}

// ============ Multiplication ============

pub fn multiply<S: KernelSample>(
    a: &[S],
    b: &[S],
    y: &mut [S],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    same_len(b.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(b.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().multiply)(a, b, y);
    Ok(())
}

pub fn multiply_inplace<S: KernelSample>(
    a: &[S],
    y: &mut [S],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().multiply_inplace)(a, y);
    Ok(())
}

pub fn multiply_const<S: KernelSample>(
    c: S,
    a: &[S],
    y: &mut [S],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().multiply_const)(c, a, y);
    Ok(())
}

pub fn multiply_const_inplace<S: KernelSample>(
    c: S,
    y: &mut [S],
    alignment: usize,
) -> KernelResult<()> {
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().multiply_const_inplace)(c, y);
    Ok(())
}

// ============ Multiply-accumulate ============

/// `y = x + a * b`
pub fn multiply_add<S: KernelSample>(
    a: &[S],
    b: &[S],
    x: &[S],
    y: &mut [S],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    same_len(b.len(), y.len())?;
    same_len(x.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(b.as_ptr(), alignment)?;
    aligned(x.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().multiply_add)(a, b, x, y);
    Ok(())
}

/// `y += a * b`
pub fn multiply_add_inplace<S: KernelSample>(
    a: &[S],
    b: &[S],
    y: &mut [S],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    same_len(b.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(b.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().multiply_add_inplace)(a, b, y);
    Ok(())
}

/// `y = x + c * a`
pub fn multiply_const_add<S: KernelSample>(
    c: S,
    a: &[S],
    x: &[S],
    y: &mut [S],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    same_len(x.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(x.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().multiply_const_add)(c, a, x, y);
    Ok(())
}

/// `y += c * a`
pub fn multiply_const_add_inplace<S: KernelSample>(
    c: S,
    a: &[S],
    y: &mut [S],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().multiply_const_add_inplace)(c, a, y);
    Ok(())
}

/// `y[i] = (y[i] if accumulate else 0) + (base_gain + ramp_gain * r[i]) * in[i]`
pub fn ramp_scale<S: KernelSample>(
    input: &[S],
    ramp: &[S],
    output: &mut [S],
    base_gain: S,
    ramp_gain: S,
    accumulate: bool,
    alignment: usize,
) -> KernelResult<()> {
    same_len(input.len(), output.len())?;
    same_len(ramp.len(), output.len())?;
    aligned(input.as_ptr(), alignment)?;
    aligned(ramp.as_ptr(), alignment)?;
    aligned(output.as_ptr(), alignment)?;
    (S::active_table().ramp_scale)(input, ramp, output, base_gain, ramp_gain, accumulate);
    Ok(())
}

// ============ Complex arithmetic ============

pub fn complex_multiply<S: KernelSample>(
    a: &[Complex<S>],
    b: &[Complex<S>],
    y: &mut [Complex<S>],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    same_len(b.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(b.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().complex_multiply)(a, b, y);
    Ok(())
}

pub fn complex_multiply_inplace<S: KernelSample>(
    a: &[Complex<S>],
    y: &mut [Complex<S>],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().complex_multiply_inplace)(a, y);
    Ok(())
}

/// `y += a * b`, complex
pub fn complex_multiply_add_inplace<S: KernelSample>(
    a: &[Complex<S>],
    b: &[Complex<S>],
    y: &mut [Complex<S>],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    same_len(b.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(b.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().complex_multiply_add_inplace)(a, b, y);
    Ok(())
}

/// `y = c * a`, complex constant
pub fn complex_multiply_const<S: KernelSample>(
    c: Complex<S>,
    a: &[Complex<S>],
    y: &mut [Complex<S>],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().complex_multiply_const)(c, a, y);
    Ok(())
}

/// `y += c * a`, complex constant
pub fn complex_multiply_const_add_inplace<S: KernelSample>(
    c: Complex<S>,
    a: &[Complex<S>],
    y: &mut [Complex<S>],
    alignment: usize,
) -> KernelResult<()> {
    same_len(a.len(), y.len())?;
    aligned(a.as_ptr(), alignment)?;
    aligned(y.as_ptr(), alignment)?;
    (S::active_table().complex_multiply_const_add_inplace)(c, a, y);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_is_logic_error() {
        let a = [1.0f32; 4];
        let b = [1.0f32; 3];
        let mut y = [0.0f32; 4];
        assert_eq!(multiply(&a, &b, &mut y, 0), Err(KernelError::Logic));
    }

    #[test]
    fn test_ramp_requires_two_samples() {
        let mut dst = [0.0f64; 1];
        assert_eq!(ramp(&mut dst, 0.0, 1.0, true, true, 0), Err(KernelError::Logic));
    }

    #[test]
    fn test_basic_arithmetic() {
        let a = [1.0f64, 2.0, 3.0, 4.0];
        let b = [2.0f64, 2.0, 2.0, 2.0];
        let mut y = [0.0f64; 4];
        multiply(&a, &b, &mut y, 0).unwrap();
        assert_eq!(y, [2.0, 4.0, 6.0, 8.0]);
        add_inplace(&a, &mut y, 0).unwrap();
        assert_eq!(y, [3.0, 6.0, 9.0, 12.0]);
        subtract_inplace(&a, &mut y, 0).unwrap();
        assert_eq!(y, [2.0, 4.0, 6.0, 8.0]);
        multiply_const_add_inplace(0.5, &a, &mut y, 0).unwrap();
        assert_eq!(y, [2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn test_complex_ops() {
        use num_complex::Complex;
        let a = [Complex::new(1.0f64, 1.0), Complex::new(2.0, 0.0)];
        let b = [Complex::new(0.0f64, 1.0), Complex::new(0.5, 0.5)];
        let mut y = [Complex::new(0.0f64, 0.0); 2];
        complex_multiply(&a, &b, &mut y, 0).unwrap();
        assert_eq!(y[0], Complex::new(-1.0, 1.0));
        assert_eq!(y[1], Complex::new(1.0, 1.0));
        complex_multiply_const_add_inplace(Complex::new(2.0, 0.0), &a, &mut y, 0).unwrap();
        assert_eq!(y[0], Complex::new(1.0, 3.0));
    }

    #[test]
    fn test_debug_alignment_check() {
        // An odd offset into an aligned buffer violates a 4-element claim.
        let buf = aura_core::AlignedVector::<f32>::new(16, 4).unwrap();
        let mut dst = [0.0f32; 3];
        let result = copy(&buf[1..4], &mut dst, 4);
        if cfg!(debug_assertions) {
            assert_eq!(result, Err(KernelError::Alignment));
        } else {
            assert!(result.is_ok());
        }
    }
}
