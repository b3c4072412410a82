//! Runtime kernel dispatch
//!
//! The fast paths of the convolution engine run through a per-sample-type
//! table of function pointers. Detection happens once; installing a table
//! is a single atomic pointer swap, so `initialise_library` /
//! `uninitialise_library` can be called at any quiet point. A process that
//! never initialises the library runs the reference kernels.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::OnceLock;

use aura_core::Sample;
use num_complex::Complex;

use crate::kernels;

// ============ SIMD Level Detection ============

/// Detected SIMD capability level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SimdLevel {
    /// No SIMD, reference kernels
    Scalar = 0,
    /// AVX2 + FMA (256-bit)
    Avx2 = 1,
    /// ARM NEON (128-bit)
    Neon = 2,
}

impl SimdLevel {
    /// Human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            SimdLevel::Scalar => "scalar",
            SimdLevel::Avx2 => "AVX2",
            SimdLevel::Neon => "NEON",
        }
    }

    /// Vector width in f64 lanes
    pub const fn width(self) -> usize {
        match self {
            SimdLevel::Scalar => 1,
            SimdLevel::Avx2 => 4,
            SimdLevel::Neon => 2,
        }
    }
}

static DETECTED_SIMD_LEVEL: OnceLock<SimdLevel> = OnceLock::new();

/// Detect the best SIMD level available on this processor (cached).
pub fn detect_simd_level() -> SimdLevel {
    *DETECTED_SIMD_LEVEL.get_or_init(|| {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
                return SimdLevel::Avx2;
            }
            SimdLevel::Scalar
        }

        #[cfg(target_arch = "aarch64")]
        {
            // NEON is architectural on aarch64.
            SimdLevel::Neon
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            SimdLevel::Scalar
        }
    })
}

/// Back-end selection passed to [`initialise_library`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendHint {
    /// Pick the best back-end for this processor.
    #[default]
    Auto,
    /// Force the reference kernels.
    Reference,
    /// Request AVX2; falls back to reference if unavailable.
    Avx2,
    /// Request NEON; falls back to reference if unavailable.
    Neon,
}

// ============ Kernel Table ============

/// Per-operation function pointers for one sample type.
///
/// The table covers the operations on the process hot path; the cold
/// operations (ramp setup, constant add/subtract, conversions) always run
/// the reference implementation.
pub struct KernelTable<S: 'static> {
    pub level: SimdLevel,
    pub add: fn(&[S], &[S], &mut [S]),
    pub add_inplace: fn(&[S], &mut [S]),
    pub subtract: fn(&[S], &[S], &mut [S]),
    pub subtract_inplace: fn(&[S], &mut [S]),
    pub multiply: fn(&[S], &[S], &mut [S]),
    pub multiply_inplace: fn(&[S], &mut [S]),
    pub multiply_const: fn(S, &[S], &mut [S]),
    pub multiply_const_inplace: fn(S, &mut [S]),
    pub multiply_add: fn(&[S], &[S], &[S], &mut [S]),
    pub multiply_add_inplace: fn(&[S], &[S], &mut [S]),
    pub multiply_const_add: fn(S, &[S], &[S], &mut [S]),
    pub multiply_const_add_inplace: fn(S, &[S], &mut [S]),
    pub ramp_scale: fn(&[S], &[S], &mut [S], S, S, bool),
    pub complex_multiply: fn(&[Complex<S>], &[Complex<S>], &mut [Complex<S>]),
    pub complex_multiply_inplace: fn(&[Complex<S>], &mut [Complex<S>]),
    pub complex_multiply_add_inplace: fn(&[Complex<S>], &[Complex<S>], &mut [Complex<S>]),
    pub complex_multiply_const: fn(Complex<S>, &[Complex<S>], &mut [Complex<S>]),
    pub complex_multiply_const_add_inplace: fn(Complex<S>, &[Complex<S>], &mut [Complex<S>]),
}

macro_rules! reference_table {
    ($t:ty) => {
        KernelTable::<$t> {
            level: SimdLevel::Scalar,
            add: kernels::add::<$t>,
            add_inplace: kernels::add_inplace::<$t>,
            subtract: kernels::subtract::<$t>,
            subtract_inplace: kernels::subtract_inplace::<$t>,
            multiply: kernels::multiply::<$t>,
            multiply_inplace: kernels::multiply_inplace::<$t>,
            multiply_const: kernels::multiply_const::<$t>,
            multiply_const_inplace: kernels::multiply_const_inplace::<$t>,
            multiply_add: kernels::multiply_add::<$t>,
            multiply_add_inplace: kernels::multiply_add_inplace::<$t>,
            multiply_const_add: kernels::multiply_const_add::<$t>,
            multiply_const_add_inplace: kernels::multiply_const_add_inplace::<$t>,
            ramp_scale: kernels::ramp_scale::<$t>,
            complex_multiply: kernels::complex_multiply::<$t>,
            complex_multiply_inplace: kernels::complex_multiply_inplace::<$t>,
            complex_multiply_add_inplace: kernels::complex_multiply_add_inplace::<$t>,
            complex_multiply_const: kernels::complex_multiply_const::<$t>,
            complex_multiply_const_add_inplace: kernels::complex_multiply_const_add_inplace::<$t>,
        }
    };
}

static REFERENCE_F32: KernelTable<f32> = reference_table!(f32);
static REFERENCE_F64: KernelTable<f64> = reference_table!(f64);

#[cfg(target_arch = "x86_64")]
static AVX2_F32: KernelTable<f32> = KernelTable {
    level: SimdLevel::Avx2,
    add: crate::simd_x86::add_f32,
    add_inplace: crate::simd_x86::add_inplace_f32,
    subtract: kernels::subtract::<f32>,
    subtract_inplace: kernels::subtract_inplace::<f32>,
    multiply: crate::simd_x86::multiply_f32,
    multiply_inplace: crate::simd_x86::multiply_inplace_f32,
    multiply_const: crate::simd_x86::multiply_const_f32,
    multiply_const_inplace: crate::simd_x86::multiply_const_inplace_f32,
    multiply_add: kernels::multiply_add::<f32>,
    multiply_add_inplace: crate::simd_x86::multiply_add_inplace_f32,
    multiply_const_add: kernels::multiply_const_add::<f32>,
    multiply_const_add_inplace: crate::simd_x86::multiply_const_add_inplace_f32,
    ramp_scale: crate::simd_x86::ramp_scale_f32,
    complex_multiply: crate::simd_x86::complex_multiply_f32,
    complex_multiply_inplace: crate::simd_x86::complex_multiply_inplace_f32,
    complex_multiply_add_inplace: crate::simd_x86::complex_multiply_add_inplace_f32,
    complex_multiply_const: crate::simd_x86::complex_multiply_const_f32,
    complex_multiply_const_add_inplace: crate::simd_x86::complex_multiply_const_add_inplace_f32,
};

#[cfg(target_arch = "x86_64")]
static AVX2_F64: KernelTable<f64> = KernelTable {
    level: SimdLevel::Avx2,
    add: crate::simd_x86::add_f64,
    add_inplace: crate::simd_x86::add_inplace_f64,
    subtract: kernels::subtract::<f64>,
    subtract_inplace: kernels::subtract_inplace::<f64>,
    multiply: crate::simd_x86::multiply_f64,
    multiply_inplace: crate::simd_x86::multiply_inplace_f64,
    multiply_const: crate::simd_x86::multiply_const_f64,
    multiply_const_inplace: crate::simd_x86::multiply_const_inplace_f64,
    multiply_add: kernels::multiply_add::<f64>,
    multiply_add_inplace: crate::simd_x86::multiply_add_inplace_f64,
    multiply_const_add: kernels::multiply_const_add::<f64>,
    multiply_const_add_inplace: crate::simd_x86::multiply_const_add_inplace_f64,
    ramp_scale: crate::simd_x86::ramp_scale_f64,
    complex_multiply: crate::simd_x86::complex_multiply_f64,
    complex_multiply_inplace: crate::simd_x86::complex_multiply_inplace_f64,
    complex_multiply_add_inplace: crate::simd_x86::complex_multiply_add_inplace_f64,
    complex_multiply_const: crate::simd_x86::complex_multiply_const_f64,
    complex_multiply_const_add_inplace: crate::simd_x86::complex_multiply_const_add_inplace_f64,
};

#[cfg(target_arch = "aarch64")]
static NEON_F32: KernelTable<f32> = KernelTable {
    level: SimdLevel::Neon,
    add: crate::simd_neon::add_f32,
    add_inplace: crate::simd_neon::add_inplace_f32,
    subtract: kernels::subtract::<f32>,
    subtract_inplace: kernels::subtract_inplace::<f32>,
    multiply: crate::simd_neon::multiply_f32,
    multiply_inplace: crate::simd_neon::multiply_inplace_f32,
    multiply_const: crate::simd_neon::multiply_const_f32,
    multiply_const_inplace: crate::simd_neon::multiply_const_inplace_f32,
    multiply_add: kernels::multiply_add::<f32>,
    multiply_add_inplace: crate::simd_neon::multiply_add_inplace_f32,
    multiply_const_add: kernels::multiply_const_add::<f32>,
    multiply_const_add_inplace: crate::simd_neon::multiply_const_add_inplace_f32,
    ramp_scale: crate::simd_neon::ramp_scale_f32,
    complex_multiply: kernels::complex_multiply::<f32>,
    complex_multiply_inplace: kernels::complex_multiply_inplace::<f32>,
    complex_multiply_add_inplace: kernels::complex_multiply_add_inplace::<f32>,
    complex_multiply_const: kernels::complex_multiply_const::<f32>,
    complex_multiply_const_add_inplace: kernels::complex_multiply_const_add_inplace::<f32>,
};

#[cfg(target_arch = "aarch64")]
static NEON_F64: KernelTable<f64> = KernelTable {
    level: SimdLevel::Neon,
    add: crate::simd_neon::add_f64,
    add_inplace: crate::simd_neon::add_inplace_f64,
    subtract: kernels::subtract::<f64>,
    subtract_inplace: kernels::subtract_inplace::<f64>,
    multiply: crate::simd_neon::multiply_f64,
    multiply_inplace: crate::simd_neon::multiply_inplace_f64,
    multiply_const: crate::simd_neon::multiply_const_f64,
    multiply_const_inplace: crate::simd_neon::multiply_const_inplace_f64,
    multiply_add: kernels::multiply_add::<f64>,
    multiply_add_inplace: crate::simd_neon::multiply_add_inplace_f64,
    multiply_const_add: kernels::multiply_const_add::<f64>,
    multiply_const_add_inplace: crate::simd_neon::multiply_const_add_inplace_f64,
    ramp_scale: crate::simd_neon::ramp_scale_f64,
    complex_multiply: kernels::complex_multiply::<f64>,
    complex_multiply_inplace: kernels::complex_multiply_inplace::<f64>,
    complex_multiply_add_inplace: kernels::complex_multiply_add_inplace::<f64>,
    complex_multiply_const: kernels::complex_multiply_const::<f64>,
    complex_multiply_const_add_inplace: kernels::complex_multiply_const_add_inplace::<f64>,
};

// ============ Active-Table Plumbing ============

static ACTIVE_F32: AtomicPtr<KernelTable<f32>> = AtomicPtr::new(ptr::null_mut());
static ACTIVE_F64: AtomicPtr<KernelTable<f64>> = AtomicPtr::new(ptr::null_mut());

/// Sample types with a kernel dispatch table.
pub trait KernelSample: Sample {
    #[doc(hidden)]
    fn active_table() -> &'static KernelTable<Self>;
    #[doc(hidden)]
    fn install_table(table: Option<&'static KernelTable<Self>>);
    /// The reference table, always available.
    fn reference_table() -> &'static KernelTable<Self>;
}

macro_rules! kernel_sample_impl {
    ($t:ty, $active:ident, $reference:ident) => {
        impl KernelSample for $t {
            #[inline]
            fn active_table() -> &'static KernelTable<Self> {
                let ptr = $active.load(Ordering::Acquire);
                if ptr.is_null() {
                    &$reference
                } else {
                    // Installed pointers always come from 'static tables.
                    unsafe { &*ptr }
                }
            }

            fn install_table(table: Option<&'static KernelTable<Self>>) {
                let raw = table
                    .map(|t| t as *const KernelTable<Self> as *mut KernelTable<Self>)
                    .unwrap_or(ptr::null_mut());
                $active.store(raw, Ordering::Release);
            }

            fn reference_table() -> &'static KernelTable<Self> {
                &$reference
            }
        }
    };
}

kernel_sample_impl!(f32, ACTIVE_F32, REFERENCE_F32);
kernel_sample_impl!(f64, ACTIVE_F64, REFERENCE_F64);

// ============ Library Lifecycle ============

/// Install the best kernel back-end for this processor (or the hinted
/// one, when available) and return the selected level.
///
/// Calling an operation without initialising the library runs the
/// reference back-end; the swap is atomic and may happen at any quiet
/// point between `process()` calls.
pub fn initialise_library(hint: BackendHint) -> SimdLevel {
    let level = match hint {
        BackendHint::Reference => SimdLevel::Scalar,
        BackendHint::Auto => detect_simd_level(),
        BackendHint::Avx2 => {
            if detect_simd_level() == SimdLevel::Avx2 {
                SimdLevel::Avx2
            } else {
                SimdLevel::Scalar
            }
        }
        BackendHint::Neon => {
            if detect_simd_level() == SimdLevel::Neon {
                SimdLevel::Neon
            } else {
                SimdLevel::Scalar
            }
        }
    };

    match level {
        SimdLevel::Scalar => {
            f32::install_table(None);
            f64::install_table(None);
        }
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 => {
            f32::install_table(Some(&AVX2_F32));
            f64::install_table(Some(&AVX2_F64));
        }
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => {
            f32::install_table(Some(&NEON_F32));
            f64::install_table(Some(&NEON_F64));
        }
        #[cfg(not(target_arch = "x86_64"))]
        SimdLevel::Avx2 => {
            f32::install_table(None);
            f64::install_table(None);
        }
        #[cfg(not(target_arch = "aarch64"))]
        SimdLevel::Neon => {
            f32::install_table(None);
            f64::install_table(None);
        }
    }

    log::info!("vector kernels initialised: {} back-end", level.name());
    level
}

/// Restore the reference back-end.
pub fn uninitialise_library() {
    f32::install_table(None);
    f64::install_table(None);
    log::debug!("vector kernels restored to reference back-end");
}

/// The level of the currently installed back-end.
pub fn active_level() -> SimdLevel {
    f64::active_table().level
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // The dispatch tables are process-wide; serialise the tests that swap them.
    static LIFECYCLE_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_detection_is_stable() {
        let first = detect_simd_level();
        assert_eq!(first, detect_simd_level());
    }

    #[test]
    fn test_lifecycle() {
        let _guard = LIFECYCLE_LOCK.lock().unwrap();
        let level = initialise_library(BackendHint::Auto);
        assert_eq!(active_level(), level);
        uninitialise_library();
        assert_eq!(active_level(), SimdLevel::Scalar);
    }

    #[test]
    fn test_reference_hint_selects_scalar() {
        let _guard = LIFECYCLE_LOCK.lock().unwrap();
        let level = initialise_library(BackendHint::Reference);
        assert_eq!(level, SimdLevel::Scalar);
        uninitialise_library();
    }

    #[test]
    fn test_simd_matches_reference() {
        let _guard = LIFECYCLE_LOCK.lock().unwrap();
        let level = initialise_library(BackendHint::Auto);

        let n = 67; // odd length exercises the remainder loops
        let a: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
        let b: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).cos()).collect();

        let table = f64::active_table();
        assert_eq!(table.level, level);

        let mut simd = vec![0.0; n];
        let mut reference = vec![0.0; n];
        (table.multiply)(&a, &b, &mut simd);
        kernels::multiply(&a, &b, &mut reference);
        for (s, r) in simd.iter().zip(&reference) {
            assert!((s - r).abs() < 1e-12);
        }

        let mut simd_acc = b.clone();
        let mut ref_acc = b.clone();
        (table.multiply_add_inplace)(&a, &b, &mut simd_acc);
        kernels::multiply_add_inplace(&a, &b, &mut ref_acc);
        for (s, r) in simd_acc.iter().zip(&ref_acc) {
            assert!((s - r).abs() < 1e-12);
        }

        let ac: Vec<Complex<f64>> = a.iter().map(|&x| Complex::new(x, 1.0 - x)).collect();
        let bc: Vec<Complex<f64>> = b.iter().map(|&x| Complex::new(0.5 * x, x)).collect();
        let mut simd_c = vec![Complex::new(0.0, 0.0); n];
        let mut ref_c = vec![Complex::new(0.0, 0.0); n];
        (table.complex_multiply)(&ac, &bc, &mut simd_c);
        kernels::complex_multiply(&ac, &bc, &mut ref_c);
        for (s, r) in simd_c.iter().zip(&ref_c) {
            assert!((s - r).norm() < 1e-12);
        }

        uninitialise_library();
    }
}
