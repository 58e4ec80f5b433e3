//! First-order low-pass filtering of the decoupled axes.
use crate::value::AxisValue;
use std::f64::consts::PI;

/// Cutoff frequency in hundredths of a hertz; zero disables filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CutoffFrequency(u16);

impl CutoffFrequency {
    pub const UNFILTERED: Self = Self(0);

    #[inline]
    pub const fn from_centihertz(centihertz: u16) -> Self {
        Self(centihertz)
    }

    /// Nearest representable cutoff; negative or NaN input disables the filter.
    pub fn from_hertz(hz: f64) -> Self {
        if hz.is_nan() || hz <= 0.0 {
            return Self::UNFILTERED;
        }
        let centi = (hz * 100.0).round();
        if centi >= f64::from(u16::MAX) {
            Self(u16::MAX)
        } else {
            Self(centi as u16)
        }
    }

    #[inline]
    pub const fn centihertz(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn hertz(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    #[inline]
    pub const fn is_unfiltered(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for CutoffFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unfiltered() {
            f.write_str("unfiltered")
        } else {
            write!(f, "{:.2} Hz", self.hertz())
        }
    }
}

/// α = T / (T + 1/(2πf)); exactly 1 when filtering is disabled.
pub fn smoothing_factor(cutoff: CutoffFrequency, sampling_period_s: f64) -> f64 {
    if cutoff.is_unfiltered() {
        return 1.0;
    }
    let rc = 1.0 / (2.0 * PI * cutoff.hertz());
    sampling_period_s / (sampling_period_s + rc)
}

/// Per-axis filter state plus the zero offset subtracted from it.
#[derive(Debug, Clone)]
pub struct AxisFilter<V: AxisValue> {
    state: [V::Acc; 6],
    offset: [V; 6],
    seeded: bool,
}

impl<V: AxisValue> Default for AxisFilter<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: AxisValue> AxisFilter<V> {
    pub fn new() -> Self {
        Self {
            state: [V::Acc::default(); 6],
            offset: [V::default(); 6],
            seeded: false,
        }
    }

    /// Advance one revolution. The first update after construction copies
    /// the input instead of smoothing toward it.
    pub fn update(&mut self, decoupled: &[V; 6], alpha: f64) {
        if !self.seeded {
            self.state = decoupled.map(V::widen);
            self.seeded = true;
            return;
        }
        for (s, &target) in self.state.iter_mut().zip(decoupled) {
            *s = V::smooth(*s, target, alpha);
        }
    }

    /// Restart the filter at `decoupled` and make it the new zero.
    pub fn zero(&mut self, decoupled: &[V; 6]) {
        self.state = decoupled.map(V::widen);
        self.offset = *decoupled;
        self.seeded = true;
    }

    /// Filtered values relative to the zero offset.
    pub fn reported(&self) -> [V; 6] {
        std::array::from_fn(|i| V::narrow(self.state[i]).offset_by(self.offset[i]))
    }

    /// Filtered values before the offset is applied.
    pub fn state(&self) -> [V; 6] {
        self.state.map(V::narrow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::Fixed;
    use rstest::rstest;

    const PERIOD_S: f64 = 15.625e-6;

    #[test]
    fn disabled_cutoff_gives_unit_alpha() {
        assert_eq!(smoothing_factor(CutoffFrequency::UNFILTERED, 15.625e-6), 1.0);
    }

    #[test]
    fn alpha_matches_rc_formula() {
        let alpha = smoothing_factor(CutoffFrequency::from_centihertz(10_000), 15.625e-6);
        let expected = 15.625e-6 / (15.625e-6 + 1.0 / (2.0 * PI * 100.0));
        assert!((alpha - expected).abs() < 1e-15);
        assert!(alpha > 0.0 && alpha < 1.0);
    }

    #[test]
    fn higher_cutoff_smooths_less() {
        let lo = smoothing_factor(CutoffFrequency::from_hertz(1.0), 15.625e-6);
        let hi = smoothing_factor(CutoffFrequency::from_hertz(500.0), 15.625e-6);
        assert!(hi > lo);
    }

    #[test]
    fn hertz_conversion_rounds_and_clamps() {
        assert_eq!(CutoffFrequency::from_hertz(12.346).centihertz(), 1235);
        assert_eq!(CutoffFrequency::from_hertz(1.0e6).centihertz(), u16::MAX);
        assert!(CutoffFrequency::from_hertz(-3.0).is_unfiltered());
        assert_eq!(CutoffFrequency::from_centihertz(250).to_string(), "2.50 Hz");
    }

    #[test]
    fn first_update_seeds_then_smooths() {
        let mut filter = AxisFilter::<f32>::new();
        filter.update(&[0.5; 6], 0.25);
        assert_eq!(filter.state(), [0.5; 6]);
        filter.update(&[0.0; 6], 0.25);
        assert_eq!(filter.state(), [0.375; 6]);
    }

    #[test]
    fn zero_reports_zero_until_input_moves() {
        let mut filter = AxisFilter::<Fixed>::new();
        let here = [Fixed::from_wire(0x1000); 6];
        filter.update(&here, 0.1);
        filter.zero(&here);
        assert_eq!(filter.reported(), [Fixed::ZERO; 6]);
        filter.update(&[Fixed::from_wire(0x2000); 6], 1.0);
        assert_eq!(filter.reported(), [Fixed::from_wire(0x1000); 6]);
    }

    /// Step from zero to `target` and run twelve time constants.
    fn settle<V: AxisValue>(cutoff: CutoffFrequency, target: u16) -> u16 {
        let alpha = smoothing_factor(cutoff, PERIOD_S);
        let mut filter = AxisFilter::<V>::new();
        filter.update(&[V::default(); 6], alpha);
        let step = [V::from_wire(target); 6];
        for _ in 0..(12.0 / alpha).ceil() as usize {
            filter.update(&step, alpha);
        }
        filter.reported()[0].to_wire()
    }

    #[rstest]
    #[case(10)]
    #[case(1)]
    fn low_cutoffs_settle_on_the_target(#[case] centihertz: u16) {
        let cutoff = CutoffFrequency::from_centihertz(centihertz);
        for target in [0x4000u16, 0xC000] {
            let want = i32::from(target as i16);
            let settled = [settle::<f32>(cutoff, target), settle::<Fixed>(cutoff, target)];
            for got in settled {
                let got = i32::from(got as i16);
                assert!((got - want).abs() <= 1, "{cutoff}: settled at {got}, target {want}");
            }
        }
    }
}
