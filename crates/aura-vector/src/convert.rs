//! Strided sample-format conversion
//!
//! Converts between float sample types and the integer formats used at
//! the I/O boundary. Float to integer rounds to nearest and saturates;
//! integer to float is the IEEE round-to-nearest conversion.

use crate::{KernelError, KernelResult};
use aura_core::is_aligned_to;

/// Element pairs the converter supports.
pub trait ConvertElement<Dst>: Copy {
    fn convert(self) -> Dst;
}

macro_rules! float_to_int {
    ($src:ty => $($dst:ty),+) => {
        $(impl ConvertElement<$dst> for $src {
            #[inline]
            fn convert(self) -> $dst {
                // `as` saturates out-of-range values after rounding.
                self.round() as $dst
            }
        })+
    };
}

macro_rules! numeric_as {
    ($src:ty => $($dst:ty),+) => {
        $(impl ConvertElement<$dst> for $src {
            #[inline]
            fn convert(self) -> $dst {
                self as $dst
            }
        })+
    };
}

float_to_int!(f32 => i16, i32);
float_to_int!(f64 => i16, i32);
numeric_as!(i16 => f32, f64);
numeric_as!(i32 => f32, f64);
numeric_as!(f32 => f32, f64);
numeric_as!(f64 => f32, f64);

/// Convert `count` elements with independent source and destination
/// strides (in elements). Stride 1 is the contiguous case.
pub fn convert<A, B>(
    src: &[A],
    dst: &mut [B],
    count: usize,
    src_stride: usize,
    dst_stride: usize,
    alignment: usize,
) -> KernelResult<()>
where
    A: ConvertElement<B>,
    B: Copy,
{
    if count == 0 {
        return Ok(());
    }
    if src_stride == 0 || dst_stride == 0 {
        return Err(KernelError::Logic);
    }
    if src.len() < (count - 1) * src_stride + 1 || dst.len() < (count - 1) * dst_stride + 1 {
        return Err(KernelError::Logic);
    }
    #[cfg(debug_assertions)]
    {
        if !is_aligned_to(src.as_ptr(), alignment) || !is_aligned_to(dst.as_ptr(), alignment) {
            return Err(KernelError::Alignment);
        }
    }
    #[cfg(not(debug_assertions))]
    let _ = alignment;
    for i in 0..count {
        dst[i * dst_stride] = src[i * src_stride].convert();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_to_int_rounds_to_nearest() {
        let src = [0.4f32, 0.5, -0.5, 1.6];
        let mut dst = [0i16; 4];
        convert(&src, &mut dst, 4, 1, 1, 0).unwrap();
        assert_eq!(dst, [0, 1, -1, 2]);
    }

    #[test]
    fn test_float_to_int_saturates() {
        let src = [4.0e9f64, -4.0e9];
        let mut dst = [0i32; 2];
        convert(&src, &mut dst, 2, 1, 1, 0).unwrap();
        assert_eq!(dst, [i32::MAX, i32::MIN]);
    }

    #[test]
    fn test_int_to_float() {
        let src = [-32768i16, 0, 32767];
        let mut dst = [0.0f64; 3];
        convert(&src, &mut dst, 3, 1, 1, 0).unwrap();
        assert_eq!(dst, [-32768.0, 0.0, 32767.0]);
    }

    #[test]
    fn test_strided_conversion() {
        let src = [1i16, 99, 2, 99, 3, 99];
        let mut dst = [0.0f32; 3];
        convert(&src, &mut dst, 3, 2, 1, 0).unwrap();
        assert_eq!(dst, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_rejects_short_buffers() {
        let src = [1i16, 2];
        let mut dst = [0.0f32; 1];
        assert_eq!(
            convert(&src, &mut dst, 2, 1, 1, 0),
            Err(KernelError::Logic)
        );
    }
}
