// src/fire_components/harmonic_tone.rs

//! A low sine plus its second harmonic, mixed far below the noise. Adds warmth, not pitch.
use super::{advance_phase, phase_increment};

pub const DEFAULT_TONE_FREQUENCY_HZ: f32 = 55.0;
pub const DEFAULT_FUNDAMENTAL_GAIN: f32 = 0.006;
pub const DEFAULT_HARMONIC_GAIN: f32 = 0.004;
pub const DEFAULT_HARMONIC_OFFSET: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicTone {
    phase: f32,
    increment: f32,
    fundamental_gain: f32,
    harmonic_gain: f32,
    harmonic_offset: f32,
}

impl HarmonicTone {
    pub fn new(
        frequency_hz: f32,
        fundamental_gain: f32,
        harmonic_gain: f32,
        harmonic_offset: f32,
        sample_rate: f32,
    ) -> Self {
        Self {
            phase: 0.0,
            increment: phase_increment(frequency_hz, sample_rate),
            fundamental_gain,
            harmonic_gain,
            harmonic_offset,
        }
    }

    pub fn with_defaults(sample_rate: f32) -> Self {
        Self::new(
            DEFAULT_TONE_FREQUENCY_HZ,
            DEFAULT_FUNDAMENTAL_GAIN,
            DEFAULT_HARMONIC_GAIN,
            DEFAULT_HARMONIC_OFFSET,
            sample_rate,
        )
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        let out = self.fundamental_gain * self.phase.sin()
            + self.harmonic_gain * (2.0 * self.phase + self.harmonic_offset).sin();
        self.phase = advance_phase(self.phase, self.increment);
        out
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Largest magnitude the generator can emit.
    pub fn peak(&self) -> f32 {
        self.fundamental_gain.abs() + self.harmonic_gain.abs()
    }
}
