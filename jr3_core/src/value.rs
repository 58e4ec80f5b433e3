//! Numeric representation used by the decode pipeline.
use crate::codec;
use crate::fixed_point::{Fixed, FixedAcc};
use std::fmt::Debug;

/// One axis value flowing through decoupling, filtering and offsetting.
pub trait AxisValue: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    /// Short name for logs and CLI output.
    const NAME: &'static str;

    fn from_wire(raw: u16) -> Self;
    fn from_coefficient(mantissa: u16, exponent: i8) -> Self;
    fn to_wire(self) -> u16;

    /// Decoupling: one matrix row times the raw axis vector.
    fn dot(row: &[Self; 6], values: &[Self; 6]) -> Self;

    /// Low-pass filter state, wider than `Self` so that steps smaller
    /// than one unit of `Self` keep accumulating at low cutoffs.
    type Acc: Copy + Default + PartialEq + Debug + Send + Sync + 'static;

    fn widen(self) -> Self::Acc;
    fn narrow(acc: Self::Acc) -> Self;

    /// Low-pass step of `acc` toward `target` with smoothing factor `alpha`.
    /// `alpha >= 1` must land on `target` exactly.
    fn smooth(acc: Self::Acc, target: Self, alpha: f64) -> Self::Acc;

    /// `self - offset`, saturating where the representation has limits.
    fn offset_by(self, offset: Self) -> Self;

    fn to_f64(self) -> f64;
}

impl AxisValue for f32 {
    const NAME: &'static str = "float";

    #[inline]
    fn from_wire(raw: u16) -> Self {
        codec::decode(raw)
    }

    #[inline]
    fn from_coefficient(mantissa: u16, exponent: i8) -> Self {
        codec::decode_calibration(mantissa, exponent)
    }

    #[inline]
    fn to_wire(self) -> u16 {
        codec::encode(self)
    }

    #[inline]
    fn dot(row: &[Self; 6], values: &[Self; 6]) -> Self {
        row.iter().zip(values).map(|(c, v)| c * v).sum()
    }

    type Acc = f64;

    #[inline]
    fn widen(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn narrow(acc: f64) -> Self {
        acc as f32
    }

    #[inline]
    fn smooth(acc: f64, target: Self, alpha: f64) -> f64 {
        if alpha >= 1.0 {
            return f64::from(target);
        }
        acc + alpha * (f64::from(target) - acc)
    }

    #[inline]
    fn offset_by(self, offset: Self) -> Self {
        self - offset
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl AxisValue for Fixed {
    const NAME: &'static str = "fixed";

    #[inline]
    fn from_wire(raw: u16) -> Self {
        Self::from_wire(raw)
    }

    #[inline]
    fn from_coefficient(mantissa: u16, exponent: i8) -> Self {
        Self::from_coefficient(mantissa, exponent)
    }

    #[inline]
    fn to_wire(self) -> u16 {
        Self::to_wire(self)
    }

    #[inline]
    fn dot(row: &[Self; 6], values: &[Self; 6]) -> Self {
        Self::dot(row, values)
    }

    type Acc = FixedAcc;

    #[inline]
    fn widen(self) -> FixedAcc {
        FixedAcc::from(self)
    }

    #[inline]
    fn narrow(acc: FixedAcc) -> Self {
        acc.to_fixed()
    }

    #[inline]
    fn smooth(acc: FixedAcc, target: Self, alpha: f64) -> FixedAcc {
        acc.lerp_toward(target, alpha)
    }

    #[inline]
    fn offset_by(self, offset: Self) -> Self {
        self.saturating_sub(offset)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        Self::to_f64(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halves<V: AxisValue>() -> [V; 6] {
        [V::from_coefficient(0x4000, 0); 6]
    }

    fn agree_on_dot<V: AxisValue>() -> u16 {
        let row = halves::<V>();
        let values = [V::from_wire(0x2000); 6];
        V::dot(&row, &values).to_wire()
    }

    #[test]
    fn both_representations_decouple_alike() {
        // 6 × 0.5 × 0.25 = 0.75
        assert_eq!(agree_on_dot::<f32>(), 0x6000);
        assert_eq!(agree_on_dot::<Fixed>(), 0x6000);
    }

    #[test]
    fn smoothing_with_unit_alpha_is_identity() {
        fn check<V: AxisValue>() {
            let prev = V::from_wire(0x1234);
            let target = V::from_wire(0xF00D);
            assert_eq!(V::narrow(V::smooth(prev.widen(), target, 1.0)), target);
        }
        check::<f32>();
        check::<Fixed>();
    }

    #[test]
    fn offset_saturates_for_fixed_only() {
        let lo = Fixed::MIN;
        assert_eq!(lo.offset_by(Fixed::from_wire(0x4000)), Fixed::MIN);
        let f = f32::from_wire(0x8000).offset_by(0.5);
        assert_eq!(f, -1.5);
        assert_eq!(f.to_wire(), 0x8000);
    }
}
