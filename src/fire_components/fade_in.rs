// src/fire_components/fade_in.rs

//! Linear start-up ramp so the first buffer after `start()` doesn't pop.

pub const DEFAULT_FADE_IN_SECONDS: f32 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeIn {
    total_samples: u32,
    samples_remaining: u32,
}

impl FadeIn {
    pub fn new(total_samples: u32) -> Self {
        Self {
            total_samples,
            samples_remaining: total_samples,
        }
    }

    pub fn from_seconds(seconds: f32, sample_rate: f32) -> Self {
        Self::new((seconds.max(0.0) * sample_rate).round() as u32)
    }

    /// Returns the gain for this sample, then counts down one sample.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.samples_remaining == 0 {
            return 1.0;
        }
        let gain = 1.0 - self.samples_remaining as f32 / self.total_samples as f32;
        self.samples_remaining -= 1;
        gain.clamp(0.0, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.samples_remaining == 0
    }

    pub fn total_samples(&self) -> u32 {
        self.total_samples
    }

    pub fn samples_remaining(&self) -> u32 {
        self.samples_remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_is_monotonic_then_exactly_one() {
        let mut fade = FadeIn::new(1000);
        let mut previous = -1.0;
        for i in 0..1000 {
            let gain = fade.next();
            assert!(gain >= previous, "sample {i}");
            assert!((0.0..1.0).contains(&gain));
            previous = gain;
        }
        assert!(fade.is_complete());
        for _ in 0..10_000 {
            assert_eq!(fade.next(), 1.0);
        }
    }

    #[test]
    fn test_starts_at_zero() {
        let mut fade = FadeIn::new(4);
        assert_eq!(fade.next(), 0.0);
        assert_eq!(fade.next(), 0.25);
        assert_eq!(fade.next(), 0.5);
        assert_eq!(fade.next(), 0.75);
        assert_eq!(fade.next(), 1.0);
    }

    #[test]
    fn test_zero_length_is_unity() {
        let mut fade = FadeIn::new(0);
        assert!(fade.is_complete());
        assert_eq!(fade.next(), 1.0);
    }

    #[test]
    fn test_from_seconds() {
        let fade = FadeIn::from_seconds(DEFAULT_FADE_IN_SECONDS, 44_100.0);
        assert_eq!(fade.total_samples(), 110_250);
        assert_eq!(fade.samples_remaining(), 110_250);
    }
}
