// src/audio_engine.rs

//! The render plane: everything the audio callback touches.
//!
//! A [`FireRenderer`] is built fresh on every `start()`, moved into the sink's
//! callback, and dropped on `stop()`. It never allocates, locks or logs once
//! constructed. The control plane reaches it only through [`EngineControls`]
//! atomics and the crackle SPSC queue.

pub mod crackle_scheduler;
pub mod tone_shaper;

use crate::fire_components::{
    combine, soft_clip, BurstState, CrackleBurst, CrackleEvent, FadeIn, HarmonicTone,
    ModulationBank, PinkNoise,
};
use crate::soundscape::FireTuning;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// Scaler for storing float values in atomics.
pub const PARAM_SCALER: f32 = 1_000_000.0;

/// Pending crackle triggers the render plane can hold between two buffers.
pub const CRACKLE_QUEUE_CAPACITY: usize = 16;

/// Creates the crackle trigger queue. Returns (producer for the scheduler, consumer for the renderer).
pub fn crackle_queue() -> (HeapProducer<CrackleEvent>, HeapConsumer<CrackleEvent>) {
    HeapRb::<CrackleEvent>::new(CRACKLE_QUEUE_CAPACITY).split()
}

/// Parameters written by the control plane and read by the audio callback.
#[derive(Debug)]
pub struct EngineControls {
    /// Master volume in [0, 1]. Stored as `volume * PARAM_SCALER`.
    master_volume: AtomicU32,
}

impl Default for EngineControls {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl EngineControls {
    pub fn new(master_volume: f32) -> Self {
        let controls = Self {
            master_volume: AtomicU32::new(0),
        };
        controls.set_master_volume(master_volume);
        controls
    }

    /// Clamps to [0, 1] (NaN counts as silence) and stores. Returns the value actually stored.
    pub fn set_master_volume(&self, volume: f32) -> f32 {
        let clamped = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.master_volume
            .store((clamped * PARAM_SCALER).round() as u32, Ordering::Relaxed);
        clamped
    }

    #[inline]
    pub fn master_volume(&self) -> f32 {
        self.master_volume.load(Ordering::Relaxed) as f32 / PARAM_SCALER
    }
}

/// The complete per-session render state: filter memory, oscillator phases,
/// the crackle voice and the fade-in ramp.
pub struct FireRenderer {
    rng: StdRng,
    pink: PinkNoise,
    modulation: ModulationBank,
    tone: HarmonicTone,
    crackle: CrackleBurst,
    fade_in: FadeIn,
    crackle_inbox: HeapConsumer<CrackleEvent>,
    controls: Arc<EngineControls>,
}

impl FireRenderer {
    pub fn new(
        sample_rate: f32,
        tuning: &FireTuning,
        controls: Arc<EngineControls>,
        crackle_inbox: HeapConsumer<CrackleEvent>,
        seed: Option<u64>,
    ) -> Self {
        debug_assert!(sample_rate > 0.0, "renderer needs a positive sample rate");
        let m = &tuning.modulation;
        let t = &tuning.tone;
        Self {
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
            pink: PinkNoise::new(tuning.pink_gain),
            modulation: ModulationBank::new(m.frequencies_hz, m.depths, m.offsets, sample_rate),
            tone: HarmonicTone::new(
                t.frequency_hz,
                t.fundamental_gain,
                t.harmonic_gain,
                t.harmonic_offset,
                sample_rate,
            ),
            crackle: CrackleBurst::new(tuning.crackle.decay, tuning.crackle.shape_gain),
            fade_in: FadeIn::from_seconds(tuning.fade_in_seconds, sample_rate),
            crackle_inbox,
            controls,
        }
    }

    /// Applies crackle triggers queued by the scheduler. The newest one wins.
    #[inline]
    pub fn apply_pending_crackles(&mut self) {
        while let Some(event) = self.crackle_inbox.pop() {
            self.crackle.trigger(event);
        }
    }

    /// Renders one mono sample scaled by `volume`.
    #[inline]
    pub fn next_sample(&mut self, volume: f32) -> f32 {
        let white: f32 = self.rng.gen_range(-1.0..=1.0);
        let pink = self.pink.process(white);
        let modulation = self.modulation.next();
        let tone = self.tone.next();
        let crackle = if self.crackle.state() == BurstState::Bursting {
            let burst_white: f32 = self.rng.gen_range(-1.0..=1.0);
            self.crackle.next(burst_white)
        } else {
            0.0
        };

        let clipped = soft_clip(combine(pink, modulation, tone, crackle));
        clipped * self.fade_in.next() * volume
    }

    /// Fills one interleaved output buffer, writing the same sample to every channel of a frame.
    pub fn process_buffer(&mut self, data: &mut [f32], channels: usize) {
        debug_assert!(channels > 0, "output needs at least one channel");
        debug_assert!(data.len() % channels.max(1) == 0, "buffer is not whole frames");

        self.apply_pending_crackles();
        let volume = self.controls.master_volume();

        for frame in data.chunks_mut(channels.max(1)) {
            let sample = self.next_sample(volume);
            frame.iter_mut().for_each(|s| *s = sample);
        }
    }

    /// Triggers a burst directly, bypassing the queue.
    pub fn trigger_crackle(&mut self, event: CrackleEvent) {
        self.crackle.trigger(event);
    }

    /// LFO phases followed by the tone phase.
    pub fn phases(&self) -> [f32; 4] {
        let [p1, p2, p3] = self.modulation.phases();
        [p1, p2, p3, self.tone.phase()]
    }

    pub fn pink_state(&self) -> [f32; 3] {
        self.pink.state()
    }

    pub fn crackle(&self) -> &CrackleBurst {
        &self.crackle
    }

    pub fn fade_in(&self) -> &FadeIn {
        &self.fade_in
    }
}
