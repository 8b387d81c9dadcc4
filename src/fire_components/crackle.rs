// src/fire_components/crackle.rs

//! Crackle bursts: short decaying noise bursts layered over the hiss.
//!
//! The control plane decides *when* a crackle happens and hands a
//! [`CrackleEvent`] across the SPSC queue. The render plane owns a
//! [`CrackleBurst`] that turns the latest event into samples.
use crate::soundscape::CrackleTuning;
use rand::Rng;

/// One randomly drawn crackle. Applied once, then discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrackleEvent {
    /// Idle time before the burst fires.
    pub delay_seconds: f32,
    pub burst_duration_frames: u32,
    pub peak_amplitude: f32,
}

impl CrackleEvent {
    /// Draws every field uniformly from its window in `tuning`.
    pub fn random<R: Rng>(rng: &mut R, tuning: &CrackleTuning) -> Self {
        let [min_delay, max_delay] = tuning.delay_seconds;
        let [min_frames, max_frames] = tuning.burst_frames;
        let [min_amp, max_amp] = tuning.peak_amplitude;
        Self {
            delay_seconds: rng.gen_range(min_delay..=max_delay),
            burst_duration_frames: rng.gen_range(min_frames..=max_frames),
            peak_amplitude: rng.gen_range(min_amp..=max_amp),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstState {
    Idle,
    Bursting,
}

/// The audio-thread state for the crackle voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrackleBurst {
    frames_remaining: u32,
    amplitude: f32,
    decay: f32,
    shape_gain: f32,
}

impl CrackleBurst {
    pub fn new(decay: f32, shape_gain: f32) -> Self {
        debug_assert!(decay > 0.0 && decay < 1.0, "decay factor must be in (0, 1)");
        Self {
            frames_remaining: 0,
            amplitude: 0.0,
            decay,
            shape_gain,
        }
    }

    /// Starts a burst, replacing whatever was still ringing.
    pub fn trigger(&mut self, event: CrackleEvent) {
        self.frames_remaining = event.burst_duration_frames;
        self.amplitude = event.peak_amplitude;
    }

    /// Emits one sample of the burst using a fresh white noise sample.
    #[inline]
    pub fn next(&mut self, white: f32) -> f32 {
        if self.frames_remaining == 0 {
            return 0.0;
        }
        let out = self.amplitude * white * self.shape_gain;
        self.amplitude *= self.decay;
        self.frames_remaining -= 1;
        out
    }

    pub fn state(&self) -> BurstState {
        if self.frames_remaining > 0 {
            BurstState::Bursting
        } else {
            BurstState::Idle
        }
    }

    pub fn frames_remaining(&self) -> u32 {
        self.frames_remaining
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn event(frames: u32, amp: f32) -> CrackleEvent {
        CrackleEvent {
            delay_seconds: 0.0,
            burst_duration_frames: frames,
            peak_amplitude: amp,
        }
    }

    #[test]
    fn test_idle_emits_exact_zero() {
        let mut burst = CrackleBurst::new(0.985, 1.0);
        assert_eq!(burst.state(), BurstState::Idle);
        for _ in 0..64 {
            assert_eq!(burst.next(1.0), 0.0);
        }
    }

    #[test]
    fn test_burst_decays_geometrically_then_stops() {
        let decay = 0.985f32;
        let mut burst = CrackleBurst::new(decay, 1.0);
        burst.trigger(event(300, 0.02));
        assert_eq!(burst.state(), BurstState::Bursting);

        let mut previous_frames = burst.frames_remaining();
        let mut previous_amp = burst.amplitude();
        for n in 0..300 {
            let expected = 0.02 * decay.powi(n);
            assert!((burst.amplitude() - expected).abs() <= expected * 1e-4, "frame {n}");
            let out = burst.next(1.0);
            assert_eq!(out, previous_amp);
            assert!(burst.frames_remaining() < previous_frames);
            assert!(burst.amplitude() < previous_amp);
            previous_frames = burst.frames_remaining();
            previous_amp = burst.amplitude();
        }
        assert_eq!(burst.frames_remaining(), 0);
        assert_eq!(burst.state(), BurstState::Idle);
        for _ in 0..1000 {
            assert_eq!(burst.next(0.7), 0.0);
        }
    }

    #[test]
    fn test_retrigger_replaces_running_burst() {
        let mut burst = CrackleBurst::new(0.9, 1.0);
        burst.trigger(event(10, 0.5));
        burst.next(1.0);
        burst.trigger(event(4, 0.1));
        assert_eq!(burst.frames_remaining(), 4);
        assert_eq!(burst.amplitude(), 0.1);
    }

    #[test]
    fn test_shape_gain_scales_output() {
        let mut burst = CrackleBurst::new(0.985, 0.5);
        burst.trigger(event(1, 0.02));
        assert_eq!(burst.next(-1.0), -0.01);
    }

    #[test]
    fn test_random_events_respect_windows() {
        let tuning = CrackleTuning::default();
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let e = CrackleEvent::random(&mut rng, &tuning);
            assert!(e.delay_seconds >= tuning.delay_seconds[0] && e.delay_seconds <= tuning.delay_seconds[1]);
            assert!(e.burst_duration_frames >= tuning.burst_frames[0] && e.burst_duration_frames <= tuning.burst_frames[1]);
            assert!(e.peak_amplitude >= tuning.peak_amplitude[0] && e.peak_amplitude <= tuning.peak_amplitude[1]);
        }
    }
}
