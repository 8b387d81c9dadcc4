// src/soundscape.rs

//! Soundscape identifiers and the tuning constants behind the fire sound.
//! All tuning structs serialize into the settings file so they can be adjusted without a rebuild.

use crate::error::{EngineError, EngineResult};
use crate::fire_components::fade_in::DEFAULT_FADE_IN_SECONDS;
use crate::fire_components::harmonic_tone::{
    DEFAULT_FUNDAMENTAL_GAIN, DEFAULT_HARMONIC_GAIN, DEFAULT_HARMONIC_OFFSET,
    DEFAULT_TONE_FREQUENCY_HZ,
};
use crate::fire_components::modulation::{
    modulation_bounds, DEFAULT_BREATH_DEPTHS, DEFAULT_BREATH_FREQUENCIES,
    DEFAULT_BREATH_OFFSETS, MODULATION_CEILING, MODULATION_FLOOR,
};
use crate::fire_components::pink_noise::DEFAULT_PINK_GAIN;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The selectable soundscapes. Only the fire exists today.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Soundscape {
    #[default]
    Fire,
}

impl Soundscape {
    pub const ALL: [Soundscape; 1] = [Soundscape::Fire];

    pub fn id(&self) -> &'static str {
        match self {
            Soundscape::Fire => "fire",
        }
    }
}

impl fmt::Display for Soundscape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Soundscape {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Soundscape::ALL
            .into_iter()
            .find(|scape| scape.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::UnsupportedSoundscape(wanted.to_string()))
    }
}

/// Breathing modulation: one entry per LFO.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ModulationTuning {
    pub frequencies_hz: [f32; 3],
    pub depths: [f32; 3],
    pub offsets: [f32; 3],
}

impl Default for ModulationTuning {
    fn default() -> Self {
        Self {
            frequencies_hz: DEFAULT_BREATH_FREQUENCIES,
            depths: DEFAULT_BREATH_DEPTHS,
            offsets: DEFAULT_BREATH_OFFSETS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ToneTuning {
    pub frequency_hz: f32,
    pub fundamental_gain: f32,
    pub harmonic_gain: f32,
    pub harmonic_offset: f32,
}

impl Default for ToneTuning {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_TONE_FREQUENCY_HZ,
            fundamental_gain: DEFAULT_FUNDAMENTAL_GAIN,
            harmonic_gain: DEFAULT_HARMONIC_GAIN,
            harmonic_offset: DEFAULT_HARMONIC_OFFSET,
        }
    }
}

/// Crackle timing and shape. Windows are inclusive `[min, max]` pairs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CrackleTuning {
    pub delay_seconds: [f32; 2],
    pub burst_frames: [u32; 2],
    pub peak_amplitude: [f32; 2],
    pub decay: f32,
    pub shape_gain: f32,
}

impl Default for CrackleTuning {
    fn default() -> Self {
        Self {
            delay_seconds: [1.5, 3.0],
            burst_frames: [200, 600],
            peak_amplitude: [0.008, 0.025],
            decay: 0.985,
            shape_gain: 1.0,
        }
    }
}

/// Every hand-tuned constant of the fire. None of these are invariants; `validate` guards the ones that
/// would break the engine's guarantees.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct FireTuning {
    pub pink_gain: f32,
    pub modulation: ModulationTuning,
    pub tone: ToneTuning,
    pub crackle: CrackleTuning,
    pub fade_in_seconds: f32,
    /// Pause between stop and start when a restart is requested.
    pub settle_millis: u64,
}

impl Default for FireTuning {
    fn default() -> Self {
        Self {
            pink_gain: DEFAULT_PINK_GAIN,
            modulation: ModulationTuning::default(),
            tone: ToneTuning::default(),
            crackle: CrackleTuning::default(),
            fade_in_seconds: DEFAULT_FADE_IN_SECONDS,
            settle_millis: 150,
        }
    }
}

fn ensure(condition: bool, msg: impl FnOnce() -> String) -> EngineResult<()> {
    if condition {
        Ok(())
    } else {
        Err(EngineError::Configuration(msg()))
    }
}

fn ensure_window(name: &str, window: [f32; 2]) -> EngineResult<()> {
    ensure(
        window[0].is_finite() && window[1].is_finite() && window[0] >= 0.0 && window[0] <= window[1],
        || format!("{name} window {window:?} must be finite, non-negative and ordered"),
    )
}

impl FireTuning {
    /// Checks the tuning against a concrete sample rate.
    pub fn validate(&self, sample_rate: f32) -> EngineResult<()> {
        let nyquist = sample_rate / 2.0;
        ensure(self.pink_gain.is_finite() && self.pink_gain >= 0.0, || {
            format!("pink gain {} must be finite and non-negative", self.pink_gain)
        })?;

        let m = &self.modulation;
        for hz in m.frequencies_hz {
            ensure(hz.is_finite() && hz > 0.0 && hz < nyquist, || {
                format!("modulation rate {hz} Hz is outside (0, {nyquist})")
            })?;
        }
        ensure(m.depths.iter().chain(&m.offsets).all(|v| v.is_finite()), || {
            "modulation depths and offsets must be finite".to_string()
        })?;
        let (lo, hi) = modulation_bounds(m.depths);
        ensure(lo >= MODULATION_FLOOR && hi <= MODULATION_CEILING, || {
            format!(
                "modulation depths {:?} allow [{lo:.3}, {hi:.3}], outside [{MODULATION_FLOOR}, {MODULATION_CEILING}]",
                m.depths
            )
        })?;

        let t = &self.tone;
        ensure(t.frequency_hz.is_finite() && t.frequency_hz > 0.0 && t.frequency_hz < nyquist, || {
            format!("tone frequency {} Hz is outside (0, {nyquist})", t.frequency_hz)
        })?;
        ensure(
            [t.fundamental_gain, t.harmonic_gain, t.harmonic_offset].iter().all(|v| v.is_finite())
                && t.fundamental_gain >= 0.0
                && t.harmonic_gain >= 0.0,
            || "tone gains must be finite and non-negative".to_string(),
        )?;

        let c = &self.crackle;
        ensure_window("crackle delay", c.delay_seconds)?;
        ensure(c.delay_seconds[1] > 0.0, || "crackle delay window cannot be all zero".to_string())?;
        ensure_window("crackle amplitude", c.peak_amplitude)?;
        ensure(c.burst_frames[0] <= c.burst_frames[1], || {
            format!("crackle burst window {:?} is inverted", c.burst_frames)
        })?;
        ensure(c.decay > 0.0 && c.decay < 1.0, || {
            format!("crackle decay {} must be in (0, 1)", c.decay)
        })?;
        ensure(c.shape_gain.is_finite() && c.shape_gain >= 0.0, || {
            format!("crackle shape gain {} must be finite and non-negative", c.shape_gain)
        })?;

        ensure(self.fade_in_seconds.is_finite() && self.fade_in_seconds >= 0.0, || {
            format!("fade-in of {} s is invalid", self.fade_in_seconds)
        })
    }
}
