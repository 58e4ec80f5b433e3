//! Q31 fixed-point values for the decode hot loop.
//!
//! A `Fixed` is an `i32` with 31 fractional bits, covering [-1, 1). Sensor
//! words are Q15, so a wire value lands in the upper half of the word and the
//! round trip through `from_wire`/`to_wire` is exact. Arithmetic saturates
//! at the range limits instead of wrapping.

pub const FRAC_BITS: u32 = 31;
/// Distance between the Q15 wire format and Q31.
const WIRE_SHIFT: u32 = FRAC_BITS - 15;
const ONE: f64 = (1u64 << FRAC_BITS) as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed(i32);

#[inline]
fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(i32::MAX);
    pub const MIN: Self = Self(i32::MIN);

    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Sensor word (two's-complement Q15) to Q31.
    #[inline]
    pub fn from_wire(raw: u16) -> Self {
        Self(i32::from(raw as i16) << WIRE_SHIFT)
    }

    /// Calibration coefficient `mantissa × 2^exponent`, the mantissa being
    /// signed Q15. Saturates when the exponent pushes it out of range.
    pub fn from_coefficient(mantissa: u16, exponent: i8) -> Self {
        let wide = i64::from(mantissa as i16) << WIRE_SHIFT;
        let e = i32::from(exponent);
        let scaled = if e >= 0 {
            wide << e.min(32)
        } else {
            wide >> (-e).min(63)
        };
        Self(saturate(scaled))
    }

    /// Q31 back to the Q15 wire word, truncating toward zero.
    pub fn to_wire(self) -> u16 {
        let q = i64::from(self.0);
        let w = if q < 0 {
            -((-q) >> WIRE_SHIFT)
        } else {
            q >> WIRE_SHIFT
        };
        (w as i16) as u16
    }

    /// Nearest Q31 value; out-of-range input saturates, NaN maps to 0.
    pub fn from_f64(x: f64) -> Self {
        if x.is_nan() {
            return Self::ZERO;
        }
        let scaled = (x * ONE).round();
        if scaled >= f64::from(i32::MAX) {
            Self::MAX
        } else if scaled <= f64::from(i32::MIN) {
            Self::MIN
        } else {
            Self(scaled as i32)
        }
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / ONE
    }

    #[inline]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Q31 product, rounded toward negative infinity. Only `MIN × MIN`
    /// saturates.
    #[inline]
    pub fn saturating_mul(self, rhs: Self) -> Self {
        Self(saturate((i64::from(self.0) * i64::from(rhs.0)) >> FRAC_BITS))
    }

    /// Sum of products with a single rounding step at the end.
    pub fn dot(a: &[Self], b: &[Self]) -> Self {
        let acc: i128 = a
            .iter()
            .zip(b)
            .map(|(x, y)| i128::from(x.0) * i128::from(y.0))
            .sum();
        let shifted = acc >> FRAC_BITS;
        Self(shifted.clamp(i128::from(i32::MIN), i128::from(i32::MAX)) as i32)
    }
}

/// Shift right by `bits`, rounding half away from zero.
#[inline]
fn shift_round(v: i128, bits: u32) -> i128 {
    let half = 1i128 << (bits - 1);
    if v < 0 {
        -((half - v) >> bits)
    } else {
        (v + half) >> bits
    }
}

/// Low-pass accumulator: a `Fixed` carrying 31 more fractional bits (Q62),
/// so steps far below one Q31 unit still add up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedAcc(i64);

impl From<Fixed> for FixedAcc {
    #[inline]
    fn from(value: Fixed) -> Self {
        Self(i64::from(value.0) << FRAC_BITS)
    }
}

impl FixedAcc {
    /// Nearest Q31 value, saturating at the top of the range.
    #[inline]
    pub fn to_fixed(self) -> Fixed {
        let q31 = shift_round(i128::from(self.0), FRAC_BITS);
        Fixed(q31.clamp(i128::from(i32::MIN), i128::from(i32::MAX)) as i32)
    }

    /// One step of `self + α·(target − self)`, the step rounded to nearest
    /// in both directions. α ≥ 1 lands on `target` exactly, α ≤ 0 leaves
    /// `self` unchanged.
    pub fn lerp_toward(self, target: Fixed, alpha: f64) -> Self {
        if alpha >= 1.0 {
            return Self::from(target);
        }
        if alpha.is_nan() || alpha <= 0.0 {
            return self;
        }
        let a = i128::from(Fixed::from_f64(alpha).0);
        let diff = i128::from(Self::from(target).0) - i128::from(self.0);
        let next = i128::from(self.0) + shift_round(a * diff, FRAC_BITS);
        Self(next.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }
}

impl std::fmt::Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}", self.to_f64())
    }
}
