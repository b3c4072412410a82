//! AVX2 + FMA kernel back-end (x86_64)
//!
//! Each operation mirrors its reference kernel; fused multiply-add is
//! allowed to contract intermediate roundings. All loads and stores are
//! unaligned-tolerant (`loadu`/`storeu`), so a caller with a weaker
//! alignment guarantee still gets correct results. Remainder elements run
//! the scalar path.

#![cfg(target_arch = "x86_64")]

use std::arch::x86_64::*;

use num_complex::Complex;

// ============ f64 Real Operations ============

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn add_f64_impl(a: &[f64], b: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = _mm256_add_pd(_mm256_loadu_pd(ap.add(i)), _mm256_loadu_pd(bp.add(i)));
        _mm256_storeu_pd(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = a[i] + b[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn add_inplace_f64_impl(a: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = _mm256_add_pd(_mm256_loadu_pd(yp.add(i)), _mm256_loadu_pd(ap.add(i)));
        _mm256_storeu_pd(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_f64_impl(a: &[f64], b: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = _mm256_mul_pd(_mm256_loadu_pd(ap.add(i)), _mm256_loadu_pd(bp.add(i)));
        _mm256_storeu_pd(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = a[i] * b[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_inplace_f64_impl(a: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = _mm256_mul_pd(_mm256_loadu_pd(yp.add(i)), _mm256_loadu_pd(ap.add(i)));
        _mm256_storeu_pd(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] *= a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_const_f64_impl(c: f64, a: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let cv = _mm256_set1_pd(c);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        _mm256_storeu_pd(yp.add(i), _mm256_mul_pd(cv, _mm256_loadu_pd(ap.add(i))));
    }
    for i in simd_n..n {
        y[i] = c * a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_const_inplace_f64_impl(c: f64, y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let cv = _mm256_set1_pd(c);
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        _mm256_storeu_pd(yp.add(i), _mm256_mul_pd(cv, _mm256_loadu_pd(yp.add(i))));
    }
    for i in simd_n..n {
        y[i] *= c;
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_add_inplace_f64_impl(a: &[f64], b: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = _mm256_fmadd_pd(
            _mm256_loadu_pd(ap.add(i)),
            _mm256_loadu_pd(bp.add(i)),
            _mm256_loadu_pd(yp.add(i)),
        );
        _mm256_storeu_pd(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += a[i] * b[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_const_add_inplace_f64_impl(c: f64, a: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let cv = _mm256_set1_pd(c);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = _mm256_fmadd_pd(cv, _mm256_loadu_pd(ap.add(i)), _mm256_loadu_pd(yp.add(i)));
        _mm256_storeu_pd(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += c * a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn ramp_scale_f64_impl(
    input: &[f64],
    ramp: &[f64],
    output: &mut [f64],
    base_gain: f64,
    ramp_gain: f64,
    accumulate: bool,
) {
    let n = output.len();
    let simd_n = n - (n % 4);
    let g0 = _mm256_set1_pd(base_gain);
    let g1 = _mm256_set1_pd(ramp_gain);
    let xp = input.as_ptr();
    let rp = ramp.as_ptr();
    let yp = output.as_mut_ptr();
    if accumulate {
        for i in (0..simd_n).step_by(4) {
            let gain = _mm256_fmadd_pd(g1, _mm256_loadu_pd(rp.add(i)), g0);
            let r = _mm256_fmadd_pd(gain, _mm256_loadu_pd(xp.add(i)), _mm256_loadu_pd(yp.add(i)));
            _mm256_storeu_pd(yp.add(i), r);
        }
        for i in simd_n..n {
            output[i] += (base_gain + ramp_gain * ramp[i]) * input[i];
        }
    } else {
        for i in (0..simd_n).step_by(4) {
            let gain = _mm256_fmadd_pd(g1, _mm256_loadu_pd(rp.add(i)), g0);
            _mm256_storeu_pd(yp.add(i), _mm256_mul_pd(gain, _mm256_loadu_pd(xp.add(i))));
        }
        for i in simd_n..n {
            output[i] = (base_gain + ramp_gain * ramp[i]) * input[i];
        }
    }
}

// ============ f64 Complex Operations ============

/// Interleaved complex multiply of two vectors of `[re, im]` pairs.
/// Even lanes take `a*b - c`, odd lanes `a*b + c` (fmaddsub), which is
/// exactly the complex product when fed the duplicated/swapped operands.
#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn cmul_pd(x: __m256d, z: __m256d) -> __m256d {
    let xr = _mm256_movedup_pd(x); // [a0, a0, a1, a1]
    let xi = _mm256_permute_pd(x, 0xF); // [b0, b0, b1, b1]
    let zs = _mm256_permute_pd(z, 0x5); // [d0, c0, d1, c1]
    _mm256_fmaddsub_pd(xr, z, _mm256_mul_pd(xi, zs))
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn complex_multiply_f64_impl(a: &[Complex<f64>], b: &[Complex<f64>], y: &mut [Complex<f64>]) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let ap = a.as_ptr().cast::<f64>();
    let bp = b.as_ptr().cast::<f64>();
    let yp = y.as_mut_ptr().cast::<f64>();
    for i in (0..2 * simd_n).step_by(4) {
        let r = cmul_pd(_mm256_loadu_pd(ap.add(i)), _mm256_loadu_pd(bp.add(i)));
        _mm256_storeu_pd(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = a[i] * b[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn complex_multiply_inplace_f64_impl(a: &[Complex<f64>], y: &mut [Complex<f64>]) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let ap = a.as_ptr().cast::<f64>();
    let yp = y.as_mut_ptr().cast::<f64>();
    for i in (0..2 * simd_n).step_by(4) {
        let r = cmul_pd(_mm256_loadu_pd(yp.add(i)), _mm256_loadu_pd(ap.add(i)));
        _mm256_storeu_pd(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = y[i] * a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn complex_multiply_add_inplace_f64_impl(
    a: &[Complex<f64>],
    b: &[Complex<f64>],
    y: &mut [Complex<f64>],
) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let ap = a.as_ptr().cast::<f64>();
    let bp = b.as_ptr().cast::<f64>();
    let yp = y.as_mut_ptr().cast::<f64>();
    for i in (0..2 * simd_n).step_by(4) {
        let prod = cmul_pd(_mm256_loadu_pd(ap.add(i)), _mm256_loadu_pd(bp.add(i)));
        _mm256_storeu_pd(yp.add(i), _mm256_add_pd(_mm256_loadu_pd(yp.add(i)), prod));
    }
    for i in simd_n..n {
        y[i] = y[i] + a[i] * b[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn complex_multiply_const_f64_impl(
    c: Complex<f64>,
    a: &[Complex<f64>],
    y: &mut [Complex<f64>],
) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let cv = _mm256_setr_pd(c.re, c.im, c.re, c.im);
    let ap = a.as_ptr().cast::<f64>();
    let yp = y.as_mut_ptr().cast::<f64>();
    for i in (0..2 * simd_n).step_by(4) {
        _mm256_storeu_pd(yp.add(i), cmul_pd(cv, _mm256_loadu_pd(ap.add(i))));
    }
    for i in simd_n..n {
        y[i] = c * a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn complex_multiply_const_add_inplace_f64_impl(
    c: Complex<f64>,
    a: &[Complex<f64>],
    y: &mut [Complex<f64>],
) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let cv = _mm256_setr_pd(c.re, c.im, c.re, c.im);
    let ap = a.as_ptr().cast::<f64>();
    let yp = y.as_mut_ptr().cast::<f64>();
    for i in (0..2 * simd_n).step_by(4) {
        let prod = cmul_pd(cv, _mm256_loadu_pd(ap.add(i)));
        _mm256_storeu_pd(yp.add(i), _mm256_add_pd(_mm256_loadu_pd(yp.add(i)), prod));
    }
    for i in simd_n..n {
        y[i] = y[i] + c * a[i];
    }
}

// ============ f32 Real Operations ============

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn add_f32_impl(a: &[f32], b: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 8);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(8) {
        let r = _mm256_add_ps(_mm256_loadu_ps(ap.add(i)), _mm256_loadu_ps(bp.add(i)));
        _mm256_storeu_ps(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = a[i] + b[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn add_inplace_f32_impl(a: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 8);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(8) {
        let r = _mm256_add_ps(_mm256_loadu_ps(yp.add(i)), _mm256_loadu_ps(ap.add(i)));
        _mm256_storeu_ps(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_f32_impl(a: &[f32], b: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 8);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(8) {
        let r = _mm256_mul_ps(_mm256_loadu_ps(ap.add(i)), _mm256_loadu_ps(bp.add(i)));
        _mm256_storeu_ps(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = a[i] * b[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_inplace_f32_impl(a: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 8);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(8) {
        let r = _mm256_mul_ps(_mm256_loadu_ps(yp.add(i)), _mm256_loadu_ps(ap.add(i)));
        _mm256_storeu_ps(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] *= a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_const_f32_impl(c: f32, a: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 8);
    let cv = _mm256_set1_ps(c);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(8) {
        _mm256_storeu_ps(yp.add(i), _mm256_mul_ps(cv, _mm256_loadu_ps(ap.add(i))));
    }
    for i in simd_n..n {
        y[i] = c * a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_const_inplace_f32_impl(c: f32, y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 8);
    let cv = _mm256_set1_ps(c);
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(8) {
        _mm256_storeu_ps(yp.add(i), _mm256_mul_ps(cv, _mm256_loadu_ps(yp.add(i))));
    }
    for i in simd_n..n {
        y[i] *= c;
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_add_inplace_f32_impl(a: &[f32], b: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 8);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(8) {
        let r = _mm256_fmadd_ps(
            _mm256_loadu_ps(ap.add(i)),
            _mm256_loadu_ps(bp.add(i)),
            _mm256_loadu_ps(yp.add(i)),
        );
        _mm256_storeu_ps(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += a[i] * b[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn multiply_const_add_inplace_f32_impl(c: f32, a: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 8);
    let cv = _mm256_set1_ps(c);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(8) {
        let r = _mm256_fmadd_ps(cv, _mm256_loadu_ps(ap.add(i)), _mm256_loadu_ps(yp.add(i)));
        _mm256_storeu_ps(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += c * a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn ramp_scale_f32_impl(
    input: &[f32],
    ramp: &[f32],
    output: &mut [f32],
    base_gain: f32,
    ramp_gain: f32,
    accumulate: bool,
) {
    let n = output.len();
    let simd_n = n - (n % 8);
    let g0 = _mm256_set1_ps(base_gain);
    let g1 = _mm256_set1_ps(ramp_gain);
    let xp = input.as_ptr();
    let rp = ramp.as_ptr();
    let yp = output.as_mut_ptr();
    if accumulate {
        for i in (0..simd_n).step_by(8) {
            let gain = _mm256_fmadd_ps(g1, _mm256_loadu_ps(rp.add(i)), g0);
            let r = _mm256_fmadd_ps(gain, _mm256_loadu_ps(xp.add(i)), _mm256_loadu_ps(yp.add(i)));
            _mm256_storeu_ps(yp.add(i), r);
        }
        for i in simd_n..n {
            output[i] += (base_gain + ramp_gain * ramp[i]) * input[i];
        }
    } else {
        for i in (0..simd_n).step_by(8) {
            let gain = _mm256_fmadd_ps(g1, _mm256_loadu_ps(rp.add(i)), g0);
            _mm256_storeu_ps(yp.add(i), _mm256_mul_ps(gain, _mm256_loadu_ps(xp.add(i))));
        }
        for i in simd_n..n {
            output[i] = (base_gain + ramp_gain * ramp[i]) * input[i];
        }
    }
}

// ============ f32 Complex Operations ============

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn cmul_ps(x: __m256, z: __m256) -> __m256 {
    let xr = _mm256_moveldup_ps(x); // [a0, a0, a1, a1, ...]
    let xi = _mm256_movehdup_ps(x); // [b0, b0, b1, b1, ...]
    let zs = _mm256_permute_ps(z, 0xB1); // swap re/im pairs
    _mm256_fmaddsub_ps(xr, z, _mm256_mul_ps(xi, zs))
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn complex_multiply_f32_impl(a: &[Complex<f32>], b: &[Complex<f32>], y: &mut [Complex<f32>]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr().cast::<f32>();
    let bp = b.as_ptr().cast::<f32>();
    let yp = y.as_mut_ptr().cast::<f32>();
    for i in (0..2 * simd_n).step_by(8) {
        let r = cmul_ps(_mm256_loadu_ps(ap.add(i)), _mm256_loadu_ps(bp.add(i)));
        _mm256_storeu_ps(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = a[i] * b[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn complex_multiply_inplace_f32_impl(a: &[Complex<f32>], y: &mut [Complex<f32>]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr().cast::<f32>();
    let yp = y.as_mut_ptr().cast::<f32>();
    for i in (0..2 * simd_n).step_by(8) {
        let r = cmul_ps(_mm256_loadu_ps(yp.add(i)), _mm256_loadu_ps(ap.add(i)));
        _mm256_storeu_ps(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = y[i] * a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn complex_multiply_add_inplace_f32_impl(
    a: &[Complex<f32>],
    b: &[Complex<f32>],
    y: &mut [Complex<f32>],
) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr().cast::<f32>();
    let bp = b.as_ptr().cast::<f32>();
    let yp = y.as_mut_ptr().cast::<f32>();
    for i in (0..2 * simd_n).step_by(8) {
        let prod = cmul_ps(_mm256_loadu_ps(ap.add(i)), _mm256_loadu_ps(bp.add(i)));
        _mm256_storeu_ps(yp.add(i), _mm256_add_ps(_mm256_loadu_ps(yp.add(i)), prod));
    }
    for i in simd_n..n {
        y[i] = y[i] + a[i] * b[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn complex_multiply_const_f32_impl(
    c: Complex<f32>,
    a: &[Complex<f32>],
    y: &mut [Complex<f32>],
) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let cv = _mm256_setr_ps(c.re, c.im, c.re, c.im, c.re, c.im, c.re, c.im);
    let ap = a.as_ptr().cast::<f32>();
    let yp = y.as_mut_ptr().cast::<f32>();
    for i in (0..2 * simd_n).step_by(8) {
        _mm256_storeu_ps(yp.add(i), cmul_ps(cv, _mm256_loadu_ps(ap.add(i))));
    }
    for i in simd_n..n {
        y[i] = c * a[i];
    }
}

#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn complex_multiply_const_add_inplace_f32_impl(
    c: Complex<f32>,
    a: &[Complex<f32>],
    y: &mut [Complex<f32>],
) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let cv = _mm256_setr_ps(c.re, c.im, c.re, c.im, c.re, c.im, c.re, c.im);
    let ap = a.as_ptr().cast::<f32>();
    let yp = y.as_mut_ptr().cast::<f32>();
    for i in (0..2 * simd_n).step_by(8) {
        let prod = cmul_ps(cv, _mm256_loadu_ps(ap.add(i)));
        _mm256_storeu_ps(yp.add(i), _mm256_add_ps(_mm256_loadu_ps(yp.add(i)), prod));
    }
    for i in simd_n..n {
        y[i] = y[i] + c * a[i];
    }
}

// ============ Safe Wrappers ============
//
// The dispatch layer only installs this table after runtime detection of
// AVX2 and FMA, so the target-feature calls below cannot reach an
// unsupported processor.

macro_rules! wrap {
    ($name:ident, $impl:ident, ($($arg:ident: $ty:ty),+)) => {
        pub fn $name($($arg: $ty),+) {
            unsafe { $impl($($arg),+) }
        }
    };
}

wrap!(add_f64, add_f64_impl, (a: &[f64], b: &[f64], y: &mut [f64]));
wrap!(add_inplace_f64, add_inplace_f64_impl, (a: &[f64], y: &mut [f64]));
wrap!(multiply_f64, multiply_f64_impl, (a: &[f64], b: &[f64], y: &mut [f64]));
wrap!(multiply_inplace_f64, multiply_inplace_f64_impl, (a: &[f64], y: &mut [f64]));
wrap!(multiply_const_f64, multiply_const_f64_impl, (c: f64, a: &[f64], y: &mut [f64]));
wrap!(multiply_const_inplace_f64, multiply_const_inplace_f64_impl, (c: f64, y: &mut [f64]));
wrap!(multiply_add_inplace_f64, multiply_add_inplace_f64_impl, (a: &[f64], b: &[f64], y: &mut [f64]));
wrap!(multiply_const_add_inplace_f64, multiply_const_add_inplace_f64_impl, (c: f64, a: &[f64], y: &mut [f64]));
wrap!(ramp_scale_f64, ramp_scale_f64_impl, (input: &[f64], ramp: &[f64], output: &mut [f64], base_gain: f64, ramp_gain: f64, accumulate: bool));
wrap!(complex_multiply_f64, complex_multiply_f64_impl, (a: &[Complex<f64>], b: &[Complex<f64>], y: &mut [Complex<f64>]));
wrap!(complex_multiply_inplace_f64, complex_multiply_inplace_f64_impl, (a: &[Complex<f64>], y: &mut [Complex<f64>]));
wrap!(complex_multiply_add_inplace_f64, complex_multiply_add_inplace_f64_impl, (a: &[Complex<f64>], b: &[Complex<f64>], y: &mut [Complex<f64>]));
wrap!(complex_multiply_const_f64, complex_multiply_const_f64_impl, (c: Complex<f64>, a: &[Complex<f64>], y: &mut [Complex<f64>]));
wrap!(complex_multiply_const_add_inplace_f64, complex_multiply_const_add_inplace_f64_impl, (c: Complex<f64>, a: &[Complex<f64>], y: &mut [Complex<f64>]));

wrap!(add_f32, add_f32_impl, (a: &[f32], b: &[f32], y: &mut [f32]));
wrap!(add_inplace_f32, add_inplace_f32_impl, (a: &[f32], y: &mut [f32]));
wrap!(multiply_f32, multiply_f32_impl, (a: &[f32], b: &[f32], y: &mut [f32]));
wrap!(multiply_inplace_f32, multiply_inplace_f32_impl, (a: &[f32], y: &mut [f32]));
wrap!(multiply_const_f32, multiply_const_f32_impl, (c: f32, a: &[f32], y: &mut [f32]));
wrap!(multiply_const_inplace_f32, multiply_const_inplace_f32_impl, (c: f32, y: &mut [f32]));
wrap!(multiply_add_inplace_f32, multiply_add_inplace_f32_impl, (a: &[f32], b: &[f32], y: &mut [f32]));
wrap!(multiply_const_add_inplace_f32, multiply_const_add_inplace_f32_impl, (c: f32, a: &[f32], y: &mut [f32]));
wrap!(ramp_scale_f32, ramp_scale_f32_impl, (input: &[f32], ramp: &[f32], output: &mut [f32], base_gain: f32, ramp_gain: f32, accumulate: bool));
wrap!(complex_multiply_f32, complex_multiply_f32_impl, (a: &[Complex<f32>], b: &[Complex<f32>], y: &mut [Complex<f32>]));
wrap!(complex_multiply_inplace_f32, complex_multiply_inplace_f32_impl, (a: &[Complex<f32>], y: &mut [Complex<f32>]));
wrap!(complex_multiply_add_inplace_f32, complex_multiply_add_inplace_f32_impl, (a: &[Complex<f32>], b: &[Complex<f32>], y: &mut [Complex<f32>]));
wrap!(complex_multiply_const_f32, complex_multiply_const_f32_impl, (c: Complex<f32>, a: &[Complex<f32>], y: &mut [Complex<f32>]));
wrap!(complex_multiply_const_add_inplace_f32, complex_multiply_const_add_inplace_f32_impl, (c: Complex<f32>, a: &[Complex<f32>], y: &mut [Complex<f32>]));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels;

    fn have_avx2() -> bool {
        is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
    }

    #[test]
    fn test_complex_multiply_matches_reference() {
        if !have_avx2() {
            return;
        }
        let a: Vec<Complex<f64>> = (0..13)
            .map(|i| Complex::new(i as f64 * 0.5, 1.0 - i as f64 * 0.25))
            .collect();
        let b: Vec<Complex<f64>> = (0..13)
            .map(|i| Complex::new(-(i as f64) * 0.125, i as f64))
            .collect();
        let mut fast = vec![Complex::new(0.0, 0.0); 13];
        let mut reference = vec![Complex::new(0.0, 0.0); 13];
        complex_multiply_f64(&a, &b, &mut fast);
        kernels::complex_multiply(&a, &b, &mut reference);
        for (f, r) in fast.iter().zip(&reference) {
            assert!((f - r).norm() < 1e-12, "{f} != {r}");
        }
    }

    #[test]
    fn test_ramp_scale_matches_reference() {
        if !have_avx2() {
            return;
        }
        let input: Vec<f32> = (0..37).map(|i| i as f32 * 0.25).collect();
        let ramp: Vec<f32> = (0..37).map(|i| i as f32 / 37.0).collect();
        let mut fast = vec![1.0f32; 37];
        let mut reference = vec![1.0f32; 37];
        ramp_scale_f32(&input, &ramp, &mut fast, 0.5, 2.0, true);
        kernels::ramp_scale(&input, &ramp, &mut reference, 0.5, 2.0, true);
        for (f, r) in fast.iter().zip(&reference) {
            assert!((f - r).abs() < 1e-5);
        }
    }
}
