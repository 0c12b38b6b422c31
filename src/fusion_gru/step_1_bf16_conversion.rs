// External imports
use ndarray::Array2;

/// # bfloat16 Bit Truncation
///
/// bf16 is the upper half of an IEEE 754 single-precision float:
///
/// ```text
/// f32:  SEEEEEEE EMMMMMMM MMMMMMMM MMMMMMMM
/// bf16: SEEEEEEE EMMMMMMM
/// ```
///
/// Conversion from f32 drops the low 16 mantissa bits (round toward zero, not
/// round-to-nearest-even). Widening back to f32 zero-fills them and is exact.
///
/// A truncated value `v` stands for every f32 in `[v, next(v))` (toward zero),
/// so a consumer that wants an unbiased estimate widens to the middle of that
/// interval instead, with [`Bf16::to_f32_midpoint`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Bf16(pub u16);

impl Bf16 {
    /// Truncate an f32 to bf16
    #[inline]
    pub fn from_f32_truncate(value: f32) -> Self {
        Self((value.to_bits() >> 16) as u16)
    }

    /// Widen to f32 (exact)
    #[inline]
    pub fn to_f32(self) -> f32 {
        f32::from_bits((self.0 as u32) << 16)
    }

    /// Widen to the centre of the f32 interval this value was truncated from
    ///
    /// Zeros, infinities and NaN widen exactly.
    #[inline]
    pub fn to_f32_midpoint(self) -> f32 {
        let magnitude = self.0 & 0x7FFF;
        if magnitude == 0 || magnitude >= 0x7F80 {
            return self.to_f32();
        }
        f32::from_bits(((self.0 as u32) << 16) | 0x8000)
    }
}

/// Upper 16 bits of the f32 bit pattern
#[inline]
pub fn copy_bits_from_float_to_uint16(value: f32) -> u16 {
    Bf16::from_f32_truncate(value).0
}

/// Inverse of [`copy_bits_from_float_to_uint16`] for already-truncated values
#[inline]
pub fn copy_bits_from_uint16_to_float(bits: u16) -> f32 {
    Bf16(bits).to_f32()
}

/// Element-wise truncation of an f32 array to bf16 bit patterns, shape preserved
pub fn convert_float_to_uint16(values: &Array2<f32>) -> Array2<u16> {
    values.mapv(copy_bits_from_float_to_uint16)
}

/// Element-wise widening of bf16 bit patterns back to f32, shape preserved
pub fn convert_uint16_to_float(bits: &Array2<u16>) -> Array2<f32> {
    bits.mapv(copy_bits_from_uint16_to_float)
}

/// Element-wise midpoint widening of truncated bf16 bit patterns
pub fn convert_uint16_to_float_midpoint(bits: &Array2<u16>) -> Array2<f32> {
    bits.mapv(|b| Bf16(b).to_f32_midpoint())
}
