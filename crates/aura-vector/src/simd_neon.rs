//! NEON kernel back-end (aarch64)
//!
//! Covers the real-valued hot operations; the complex operations fall
//! back to the reference kernels in the NEON table. NEON is architectural
//! on aarch64, so no runtime feature gate is needed beyond the dispatch
//! layer's platform check.

#![cfg(target_arch = "aarch64")]

use std::arch::aarch64::*;

// ============ f64 (2 lanes) ============

unsafe fn add_f64_impl(a: &[f64], b: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(2) {
        let r = vaddq_f64(vld1q_f64(ap.add(i)), vld1q_f64(bp.add(i)));
        vst1q_f64(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = a[i] + b[i];
    }
}

unsafe fn add_inplace_f64_impl(a: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(2) {
        let r = vaddq_f64(vld1q_f64(yp.add(i)), vld1q_f64(ap.add(i)));
        vst1q_f64(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += a[i];
    }
}

unsafe fn multiply_f64_impl(a: &[f64], b: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(2) {
        let r = vmulq_f64(vld1q_f64(ap.add(i)), vld1q_f64(bp.add(i)));
        vst1q_f64(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = a[i] * b[i];
    }
}

unsafe fn multiply_inplace_f64_impl(a: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(2) {
        let r = vmulq_f64(vld1q_f64(yp.add(i)), vld1q_f64(ap.add(i)));
        vst1q_f64(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] *= a[i];
    }
}

unsafe fn multiply_const_f64_impl(c: f64, a: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let cv = vdupq_n_f64(c);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(2) {
        vst1q_f64(yp.add(i), vmulq_f64(cv, vld1q_f64(ap.add(i))));
    }
    for i in simd_n..n {
        y[i] = c * a[i];
    }
}

unsafe fn multiply_const_inplace_f64_impl(c: f64, y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let cv = vdupq_n_f64(c);
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(2) {
        vst1q_f64(yp.add(i), vmulq_f64(cv, vld1q_f64(yp.add(i))));
    }
    for i in simd_n..n {
        y[i] *= c;
    }
}

unsafe fn multiply_add_inplace_f64_impl(a: &[f64], b: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(2) {
        let r = vfmaq_f64(vld1q_f64(yp.add(i)), vld1q_f64(ap.add(i)), vld1q_f64(bp.add(i)));
        vst1q_f64(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += a[i] * b[i];
    }
}

unsafe fn multiply_const_add_inplace_f64_impl(c: f64, a: &[f64], y: &mut [f64]) {
    let n = y.len();
    let simd_n = n - (n % 2);
    let cv = vdupq_n_f64(c);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(2) {
        let r = vfmaq_f64(vld1q_f64(yp.add(i)), cv, vld1q_f64(ap.add(i)));
        vst1q_f64(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += c * a[i];
    }
}

unsafe fn ramp_scale_f64_impl(
    input: &[f64],
    ramp: &[f64],
    output: &mut [f64],
    base_gain: f64,
    ramp_gain: f64,
    accumulate: bool,
) {
    let n = output.len();
    let simd_n = n - (n % 2);
    let g0 = vdupq_n_f64(base_gain);
    let g1 = vdupq_n_f64(ramp_gain);
    let xp = input.as_ptr();
    let rp = ramp.as_ptr();
    let yp = output.as_mut_ptr();
    if accumulate {
        for i in (0..simd_n).step_by(2) {
            let gain = vfmaq_f64(g0, g1, vld1q_f64(rp.add(i)));
            let r = vfmaq_f64(vld1q_f64(yp.add(i)), gain, vld1q_f64(xp.add(i)));
            vst1q_f64(yp.add(i), r);
        }
        for i in simd_n..n {
            output[i] += (base_gain + ramp_gain * ramp[i]) * input[i];
        }
    } else {
        for i in (0..simd_n).step_by(2) {
            let gain = vfmaq_f64(g0, g1, vld1q_f64(rp.add(i)));
            vst1q_f64(yp.add(i), vmulq_f64(gain, vld1q_f64(xp.add(i))));
        }
        for i in simd_n..n {
            output[i] = (base_gain + ramp_gain * ramp[i]) * input[i];
        }
    }
}

// ============ f32 (4 lanes) ============

unsafe fn add_f32_impl(a: &[f32], b: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = vaddq_f32(vld1q_f32(ap.add(i)), vld1q_f32(bp.add(i)));
        vst1q_f32(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = a[i] + b[i];
    }
}

unsafe fn add_inplace_f32_impl(a: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = vaddq_f32(vld1q_f32(yp.add(i)), vld1q_f32(ap.add(i)));
        vst1q_f32(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += a[i];
    }
}

unsafe fn multiply_f32_impl(a: &[f32], b: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = vmulq_f32(vld1q_f32(ap.add(i)), vld1q_f32(bp.add(i)));
        vst1q_f32(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] = a[i] * b[i];
    }
}

unsafe fn multiply_inplace_f32_impl(a: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = vmulq_f32(vld1q_f32(yp.add(i)), vld1q_f32(ap.add(i)));
        vst1q_f32(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] *= a[i];
    }
}

unsafe fn multiply_const_f32_impl(c: f32, a: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let cv = vdupq_n_f32(c);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        vst1q_f32(yp.add(i), vmulq_f32(cv, vld1q_f32(ap.add(i))));
    }
    for i in simd_n..n {
        y[i] = c * a[i];
    }
}

unsafe fn multiply_const_inplace_f32_impl(c: f32, y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let cv = vdupq_n_f32(c);
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        vst1q_f32(yp.add(i), vmulq_f32(cv, vld1q_f32(yp.add(i))));
    }
    for i in simd_n..n {
        y[i] *= c;
    }
}

unsafe fn multiply_add_inplace_f32_impl(a: &[f32], b: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let ap = a.as_ptr();
    let bp = b.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = vfmaq_f32(vld1q_f32(yp.add(i)), vld1q_f32(ap.add(i)), vld1q_f32(bp.add(i)));
        vst1q_f32(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += a[i] * b[i];
    }
}

unsafe fn multiply_const_add_inplace_f32_impl(c: f32, a: &[f32], y: &mut [f32]) {
    let n = y.len();
    let simd_n = n - (n % 4);
    let cv = vdupq_n_f32(c);
    let ap = a.as_ptr();
    let yp = y.as_mut_ptr();
    for i in (0..simd_n).step_by(4) {
        let r = vfmaq_f32(vld1q_f32(yp.add(i)), cv, vld1q_f32(ap.add(i)));
        vst1q_f32(yp.add(i), r);
    }
    for i in simd_n..n {
        y[i] += c * a[i];
    }
}

unsafe fn ramp_scale_f32_impl(
    input: &[f32],
    ramp: &[f32],
    output: &mut [f32],
    base_gain: f32,
    ramp_gain: f32,
    accumulate: bool,
) {
    let n = output.len();
    let simd_n = n - (n % 4);
    let g0 = vdupq_n_f32(base_gain);
    let g1 = vdupq_n_f32(ramp_gain);
    let xp = input.as_ptr();
    let rp = ramp.as_ptr();
    let yp = output.as_mut_ptr();
    if accumulate {
        for i in (0..simd_n).step_by(4) {
            let gain = vfmaq_f32(g0, g1, vld1q_f32(rp.add(i)));
            let r = vfmaq_f32(vld1q_f32(yp.add(i)), gain, vld1q_f32(xp.add(i)));
            vst1q_f32(yp.add(i), r);
        }
        for i in simd_n..n {
            output[i] += (base_gain + ramp_gain * ramp[i]) * input[i];
        }
    } else {
        for i in (0..simd_n).step_by(4) {
            let gain = vfmaq_f32(g0, g1, vld1q_f32(rp.add(i)));
            vst1q_f32(yp.add(i), vmulq_f32(gain, vld1q_f32(xp.add(i))));
        }
        for i in simd_n..n {
            output[i] = (base_gain + ramp_gain * ramp[i]) * input[i];
        }
    }
}

// ============ Safe Wrappers ============

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

wrap!(add_f32, add_f32_impl, (a: &[f32], b: &[f32], y: &mut [f32]));
wrap!(add_inplace_f32, add_inplace_f32_impl, (a: &[f32], y: &mut [f32]));
wrap!(multiply_f32, multiply_f32_impl, (a: &[f32], b: &[f32], y: &mut [f32]));
wrap!(multiply_inplace_f32, multiply_inplace_f32_impl, (a: &[f32], y: &mut [f32]));
wrap!(multiply_const_f32, multiply_const_f32_impl, (c: f32, a: &[f32], y: &mut [f32]));
wrap!(multiply_const_inplace_f32, multiply_const_inplace_f32_impl, (c: f32, y: &mut [f32]));
wrap!(multiply_add_inplace_f32, multiply_add_inplace_f32_impl, (a: &[f32], b: &[f32], y: &mut [f32]));
wrap!(multiply_const_add_inplace_f32, multiply_const_add_inplace_f32_impl, (c: f32, a: &[f32], y: &mut [f32]));
wrap!(ramp_scale_f32, ramp_scale_f32_impl, (input: &[f32], ramp: &[f32], output: &mut [f32], base_gain: f32, ramp_gain: f32, accumulate: bool));
