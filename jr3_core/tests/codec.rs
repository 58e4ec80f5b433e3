use jr3_core::codec::{decode, decode_calibration, encode};
use jr3_core::{AxisValue, Fixed};
use proptest::prelude::*;

#[test]
fn every_wire_word_round_trips_through_f32() {
    for raw in 0..=u16::MAX {
        assert_eq!(encode(decode(raw)), raw, "raw {raw:#06x}");
    }
}

#[test]
fn normalized_mantissas_round_trip_at_unit_exponent() {
    let normalized = (0x4000u16..=0x7FFF).chain(0x8000..=0xBFFF);
    for m in normalized {
        assert_eq!(encode(decode_calibration(m, 0)), m, "mantissa {m:#06x}");
    }
}

#[test]
fn float_and_fixed_agree_on_every_wire_word() {
    for raw in 0..=u16::MAX {
        let fixed = Fixed::from_wire(raw).to_f64();
        let float = f64::from(decode(raw));
        assert_eq!(fixed, float, "raw {raw:#06x}");
    }
}

#[test]
fn decode_is_monotonic_in_signed_order() {
    let mut previous = decode(0x8000);
    for signed in (i16::MIN + 1)..=i16::MAX {
        let value = decode(signed as u16);
        assert!(value > previous, "{signed}");
        previous = value;
    }
}

fn normalized_mantissa() -> impl Strategy<Value = u16> {
    prop_oneof![0x4000u16..=0x7FFF, 0x8000u16..=0xBFFF]
}

proptest! {
    #[test]
    fn coefficient_value_matches_definition(m in any::<u16>(), e in -20i8..=20) {
        let expected = f64::from(m as i16) / 32768.0 * 2f64.powi(i32::from(e));
        prop_assert_eq!(f64::from(decode_calibration(m, e)), expected);
    }

    #[test]
    fn fixed_coefficient_matches_float_when_in_range(m in any::<u16>(), e in -14i8..=0) {
        let fixed = Fixed::from_coefficient(m, e).to_f64();
        let float = f64::from(decode_calibration(m, e));
        prop_assert_eq!(fixed, float);
    }

    #[test]
    fn encode_never_rounds_away_from_zero(x in -0.999f32..0.999) {
        let back = f64::from(decode(encode(x)));
        prop_assert!(back.abs() <= f64::from(x).abs());
        prop_assert!((f64::from(x) - back).abs() < 1.0 / 32768.0);
    }

    #[test]
    fn decoupling_paths_agree_within_one_step(
        coefficients in prop::array::uniform6((normalized_mantissa(), -6i8..=-3)),
        raw in prop::array::uniform6(any::<u16>()),
    ) {
        let row_f: [f32; 6] = coefficients.map(|(m, e)| f32::from_coefficient(m, e));
        let row_q: [Fixed; 6] = coefficients.map(|(m, e)| Fixed::from_coefficient(m, e));
        let raw_f = raw.map(f32::from_wire);
        let raw_q = raw.map(Fixed::from_wire);
        let via_float = f32::dot(&row_f, &raw_f).to_wire() as i16;
        let via_fixed = Fixed::dot(&row_q, &raw_q).to_wire() as i16;
        prop_assert!((i32::from(via_float) - i32::from(via_fixed)).abs() <= 1);
    }
}
