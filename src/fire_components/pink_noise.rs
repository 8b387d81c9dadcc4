// src/fire_components/pink_noise.rs

//! Pink noise via Paul Kellet's economy three-pole filter.
//!
//! White noise goes in, an approximately 1/f spectrum comes out. This is the
//! broadband "hiss" the rest of the fire sits on.

/// Default attenuation applied after the filter so the noise floor sits well below full scale.
pub const DEFAULT_PINK_GAIN: f32 = 0.025;

/// The audio-thread state for the pink noise filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinkNoise {
    b0: f32,
    b1: f32,
    b2: f32,
    gain: f32,
}

impl Default for PinkNoise {
    fn default() -> Self {
        Self::new(DEFAULT_PINK_GAIN)
    }
}

impl PinkNoise {
    pub fn new(gain: f32) -> Self {
        Self {
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            gain,
        }
    }

    /// Filters one white noise sample in `[-1, 1]` and returns the attenuated pink sample.
    #[inline]
    pub fn process(&mut self, white: f32) -> f32 {
        self.b0 = 0.99765 * self.b0 + white * 0.0990460;
        self.b1 = 0.96300 * self.b1 + white * 0.2965164;
        self.b2 = 0.57000 * self.b2 + white * 1.0526913;
        let pink = self.b0 + self.b1 + self.b2 + white * 0.1848;
        pink * self.gain
    }

    /// Filter memory as `[b0, b1, b2]`.
    pub fn state(&self) -> [f32; 3] {
        [self.b0, self.b1, self.b2]
    }

    pub fn reset(&mut self) {
        self.b0 = 0.0;
        self.b1 = 0.0;
        self.b2 = 0.0;
    }
}
