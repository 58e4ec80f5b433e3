//! The sensor's 16-bit value convention and its IEEE-754 mapping.
//!
//! Axis words are two's-complement with an implied binary point after the
//! sign bit. Calibration coefficients pair such a mantissa with a signed
//! 8-bit power-of-two exponent. All conversions here work on the bit patterns
//! directly so results are identical on every target.

const SIGN_BIT: u32 = 1 << 31;
const EXPONENT_BIAS: i32 = 126;
const MANTISSA_MASK: u32 = 0x3FFF;
const EXPONENT_SHIFT: u32 = 23;
/// Places a 14-bit magnitude under the f32 exponent field.
const MAGNITUDE_SHIFT: u32 = 9;

/// Build an f32 from a 16-bit mantissa and a power-of-two exponent.
///
/// The value is `m / 2^15 × 2^e` with `m` two's-complement. The mantissa is
/// normalized first (shifted until bit 14 differs from the sign bit). A zero
/// mantissa is 0.0 and results below the normal range flush to a signed zero.
pub fn decode_calibration(mantissa: u16, exponent: i8) -> f32 {
    if mantissa == 0 {
        return 0.0;
    }
    let (normalized, shift) = normalize(mantissa);
    compose(normalized, i32::from(exponent) - shift as i32)
}

/// Sensor word to f32 in [-1, 1).
pub fn decode(raw: u16) -> f32 {
    decode_calibration(raw, 0)
}

fn normalize(mantissa: u16) -> (u16, u32) {
    let leading = if mantissa & 0x8000 != 0 {
        (!mantissa).leading_zeros()
    } else {
        mantissa.leading_zeros()
    };
    // The sign bit is clear after complementing, so leading >= 1.
    let shift = leading.saturating_sub(1);
    (mantissa << shift, shift)
}

fn compose(mantissa: u16, exponent: i32) -> f32 {
    let negative = mantissa & 0x8000 != 0;
    let (sign, magnitude) = if negative {
        (SIGN_BIT, (u32::from(!mantissa) & MANTISSA_MASK) + 1)
    } else {
        (0, u32::from(mantissa) & MANTISSA_MASK)
    };
    let biased = exponent + EXPONENT_BIAS;
    if biased <= 0 {
        return f32::from_bits(sign);
    }
    // A 2^14 magnitude (mantissa 0x8000) carries into the exponent field:
    // exactly -1.0 × 2^e.
    let bits = sign | (((biased as u32) << EXPONENT_SHIFT) + (magnitude << MAGNITUDE_SHIFT));
    f32::from_bits(bits)
}

/// f32 to sensor word, truncating toward zero.
///
/// Values at or beyond ±1 saturate to `0x7FFF` / `0x8000`; magnitudes below
/// 2^-15 as well as NaN encode as 0.
pub fn encode(value: f32) -> u16 {
    let bits = value.to_bits();
    let negative = bits & SIGN_BIT != 0;
    let biased = ((bits >> EXPONENT_SHIFT) & 0xFF) as i32;
    if biased == 0xFF {
        if bits & 0x7F_FFFF != 0 {
            return 0;
        }
        return if negative { 0x8000 } else { 0x7FFF };
    }
    if biased == 0 {
        return 0;
    }
    // value = 1.f × 2^e
    let e = biased - 127;
    if e >= 0 {
        return if negative { 0x8000 } else { 0x7FFF };
    }
    if e < -15 {
        return 0;
    }
    let fraction = bits & 0x7F_FFFF;
    // |value| × 2^15 = (1.f) × 2^(15 + e), truncated
    let magnitude = (fraction >> (8 - e) as u32) | (1 << (15 + e) as u32);
    if negative {
        (magnitude as u16).wrapping_neg()
    } else {
        magnitude.min(0x7FFF) as u16
    }
}
