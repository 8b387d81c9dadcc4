// src/fire_components/mod.rs

//! Per-sample building blocks of the fire signal. Each one owns its own state
//! and knows nothing about threads or sinks.

pub mod crackle;
pub mod fade_in;
pub mod harmonic_tone;
pub mod modulation;
pub mod pink_noise;
pub mod soft_clip;

pub use crackle::{BurstState, CrackleBurst, CrackleEvent};
pub use fade_in::FadeIn;
pub use harmonic_tone::HarmonicTone;
pub use modulation::{modulation_bounds, BreathLfo, ModulationBank};
pub use pink_noise::PinkNoise;
pub use soft_clip::{combine, soft_clip};

use std::f32::consts::TAU;

/// Advances a radian phase accumulator by `increment` and folds it back into `[0, 2π)`.
///
/// `increment` must itself be in `[0, 2π)`, which holds for any oscillator below Nyquist.
#[inline(always)]
pub fn advance_phase(phase: f32, increment: f32) -> f32 {
    let mut next = phase + increment;
    while next >= TAU {
        next -= TAU;
    }
    if next < 0.0 {
        next = 0.0;
    }
    next
}

/// Per-sample phase increment for an oscillator at `frequency_hz`.
#[inline]
pub fn phase_increment(frequency_hz: f32, sample_rate: f32) -> f32 {
    debug_assert!(sample_rate > 0.0, "sample rate must be positive");
    (TAU * frequency_hz / sample_rate).rem_euclid(TAU)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_phase_wraps_at_tau() {
        let p = advance_phase(TAU - 0.01, 0.02);
        assert!(p >= 0.0 && p < TAU);
        assert!((p - 0.01).abs() < 1e-5);
    }

    #[test]
    fn phase_increment_matches_formula() {
        let inc = phase_increment(441.0, 44_100.0);
        assert!((inc - TAU / 100.0).abs() < 1e-7);
    }
}
