// src/fire_components/modulation.rs

//! Slow "breathing" amplitude modulation.
//!
//! Three sine LFOs are multiplied together rather than summed, so each one
//! gently scales the others and the envelope never repeats on a short cycle.
use super::{advance_phase, phase_increment};

/// Default LFO rates in Hz.
pub const DEFAULT_BREATH_FREQUENCIES: [f32; 3] = [0.08, 0.13, 0.21];
/// Default modulation depth per LFO.
pub const DEFAULT_BREATH_DEPTHS: [f32; 3] = [0.05, 0.04, 0.03];
/// Default phase offsets in radians, applied when reading each LFO.
pub const DEFAULT_BREATH_OFFSETS: [f32; 3] = [0.0, 1.3, 2.7];

/// Lowest and highest modulation the bank may ever produce.
pub const MODULATION_FLOOR: f32 = 0.8;
pub const MODULATION_CEILING: f32 = 1.2;

/// One low-frequency oscillator contributing a `1 + depth * sin(phase + offset)` factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreathLfo {
    phase: f32,
    increment: f32,
    depth: f32,
    offset: f32,
}

impl BreathLfo {
    pub fn new(frequency_hz: f32, depth: f32, offset: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            increment: phase_increment(frequency_hz, sample_rate),
            depth,
            offset,
        }
    }

    /// Returns the current factor, then advances the phase by one sample.
    #[inline]
    pub fn next_factor(&mut self) -> f32 {
        let factor = 1.0 + self.depth * (self.phase + self.offset).sin();
        self.phase = advance_phase(self.phase, self.increment);
        factor
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}

/// The audio-thread state for the three-LFO modulation bank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationBank {
    lfos: [BreathLfo; 3],
}

impl ModulationBank {
    pub fn new(
        frequencies_hz: [f32; 3],
        depths: [f32; 3],
        offsets: [f32; 3],
        sample_rate: f32,
    ) -> Self {
        Self {
            lfos: std::array::from_fn(|i| {
                BreathLfo::new(frequencies_hz[i], depths[i], offsets[i], sample_rate)
            }),
        }
    }

    pub fn with_defaults(sample_rate: f32) -> Self {
        Self::new(
            DEFAULT_BREATH_FREQUENCIES,
            DEFAULT_BREATH_DEPTHS,
            DEFAULT_BREATH_OFFSETS,
            sample_rate,
        )
    }

    /// Processes one sample of the bank, returning the combined multiplier.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.lfos
            .iter_mut()
            .fold(1.0, |acc, lfo| acc * lfo.next_factor())
    }

    pub fn phases(&self) -> [f32; 3] {
        std::array::from_fn(|i| self.lfos[i].phase())
    }
}

/// Guaranteed output range `[Π(1 - |a|), Π(1 + |a|)]` for a set of depths, independent of offsets.
pub fn modulation_bounds(depths: [f32; 3]) -> (f32, f32) {
    depths.iter().fold((1.0, 1.0), |(lo, hi), depth| {
        let a = depth.abs();
        (lo * (1.0 - a), hi * (1.0 + a))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    #[test]
    fn test_default_depths_fit_the_window() {
        let (lo, hi) = modulation_bounds(DEFAULT_BREATH_DEPTHS);
        assert!(lo >= MODULATION_FLOOR, "{lo}");
        assert!(hi <= MODULATION_CEILING, "{hi}");
    }

    #[test]
    fn test_output_stays_inside_bounds() {
        // Faster rates than the defaults so the test sweeps many full cycles.
        let mut bank = ModulationBank::new([3.0, 5.1, 7.3], DEFAULT_BREATH_DEPTHS, DEFAULT_BREATH_OFFSETS, 1000.0);
        let (lo, hi) = modulation_bounds(DEFAULT_BREATH_DEPTHS);
        for _ in 0..100_000 {
            let m = bank.next();
            assert!(m >= lo - 1e-6 && m <= hi + 1e-6, "{m}");
        }
    }

    #[test]
    fn test_first_value_uses_offsets_at_zero_phase() {
        let mut bank = ModulationBank::with_defaults(44_100.0);
        let expected = DEFAULT_BREATH_DEPTHS
            .iter()
            .zip(DEFAULT_BREATH_OFFSETS)
            .fold(1.0f32, |acc, (a, phi)| acc * (1.0 + a * phi.sin()));
        assert!((bank.next() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_product_not_sum() {
        // Two LFOs at quarter-cycle into a peak: product differs from the additive form.
        let mut bank = ModulationBank::new([0.0; 3], [0.5, 0.5, 0.0], [TAU / 4.0, TAU / 4.0, 0.0], 48_000.0);
        assert!((bank.next() - 2.25).abs() < 1e-5);
    }

    #[test]
    fn test_phases_wrap() {
        let mut bank = ModulationBank::new([900.0, 1300.0, 2100.0], DEFAULT_BREATH_DEPTHS, DEFAULT_BREATH_OFFSETS, 4410.0);
        for _ in 0..50_000 {
            bank.next();
            for p in bank.phases() {
                assert!((0.0..TAU).contains(&p), "{p}");
            }
        }
    }
}
