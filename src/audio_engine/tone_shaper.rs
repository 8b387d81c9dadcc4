// src/audio_engine/tone_shaper.rs

//! Downstream tone shaping for the cpal output: a fixed warmth EQ followed by a
//! small Schroeder reverb. The engine itself never depends on this stage; it is
//! part of the sink.

// Below this, recursive state is treated as silence. Subnormal floats are slow on x86.
const DENORMAL_FLOOR: f32 = 1e-20;

#[inline(always)]
fn flush_denormal(value: f32) -> f32 {
    if value.abs() < DENORMAL_FLOOR {
        0.0
    } else {
        value
    }
}

/// A simple one-pole low-pass filter used as the fixed "warmth" EQ.
#[derive(Debug, Clone, Copy, Default)]
struct WarmthFilter {
    z1: f32,
    coeff: f32,
}

impl WarmthFilter {
    fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self {
            z1: 0.0,
            coeff: (-std::f32::consts::TAU * cutoff_hz / sample_rate).exp(),
        }
    }

    #[inline(always)]
    fn process(&mut self, input: f32) -> f32 {
        let output = input * (1.0 - self.coeff) + self.z1 * self.coeff;
        self.z1 = flush_denormal(output);
        output
    }
}

// --- Schroeder Reverb Components ---
#[derive(Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
}

impl CombFilter {
    fn new(delay_samples: usize, feedback: f32) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            index: 0,
            feedback,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.buffer[self.index] = flush_denormal(input + output * self.feedback);
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

#[derive(Clone)]
struct AllPassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllPassFilter {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        let output = -input + delayed;
        self.buffer[self.index] = flush_denormal(input + delayed * 0.5); // G = 0.5
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

#[derive(Clone)]
struct RoomReverb {
    comb_filters: [CombFilter; 4],
    all_pass_filters: [AllPassFilter; 2],
}

impl RoomReverb {
    fn new(sample_rate: f32, decay: f32) -> Self {
        let sr_factor = sample_rate / 44100.0;
        let comb_delays = [1116.0, 1188.0, 1277.0, 1356.0];
        let allpass_delays = [225.0, 556.0];
        Self {
            comb_filters: std::array::from_fn(|i| {
                CombFilter::new((comb_delays[i] * sr_factor) as usize, decay)
            }),
            all_pass_filters: std::array::from_fn(|i| {
                AllPassFilter::new((allpass_delays[i] * sr_factor) as usize)
            }),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let comb_out = self
            .comb_filters
            .iter_mut()
            .map(|f| f.process(input))
            .sum::<f32>()
            * 0.25;
        self.all_pass_filters
            .iter_mut()
            .fold(comb_out, |acc, f| f.process(acc))
    }
}

/// Fixed EQ + reverb chain. All delay memory is allocated in [`ToneShaper::new`].
#[derive(Clone)]
pub struct ToneShaper {
    eq: WarmthFilter,
    reverb: RoomReverb,
    wet: f32,
}

impl ToneShaper {
    const WARMTH_CUTOFF_HZ: f32 = 6_000.0;
    const REVERB_DECAY: f32 = 0.72;
    const REVERB_WET: f32 = 0.18;

    pub fn new(sample_rate: f32) -> Self {
        Self {
            eq: WarmthFilter::new(Self::WARMTH_CUTOFF_HZ.min(sample_rate * 0.45), sample_rate),
            reverb: RoomReverb::new(sample_rate, Self::REVERB_DECAY),
            wet: Self::REVERB_WET,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let eq = self.eq.process(input);
        let wet = self.reverb.process(eq);
        // Reverb peaks can exceed the dry level, so the sum is clamped to full scale.
        (eq * (1.0 - self.wet) + wet * self.wet).clamp(-1.0, 1.0)
    }

    /// Processes a mono buffer in place.
    pub fn process_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}
