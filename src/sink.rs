// src/sink.rs

//! The seam between the engine and whatever plays its samples.
//!
//! A sink negotiates a format, takes ownership of a [`FireRenderer`] on
//! `connect`, and drops it on `disconnect`. Once `disconnect` returns, no
//! callback may touch the renderer again.

use crate::audio_engine::FireRenderer;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl SinkFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::config("sink reported a sample rate of 0 Hz"));
        }
        if self.channels == 0 {
            return Err(EngineError::config("sink reported zero output channels"));
        }
        Ok(())
    }
}

pub trait OutputSink {
    /// Queries the sample rate and channel layout the sink will run at.
    fn negotiate(&mut self) -> EngineResult<SinkFormat>;

    /// Moves the renderer into the sink and begins playback.
    fn connect(&mut self, renderer: FireRenderer, format: SinkFormat) -> EngineResult<()>;

    /// Halts playback and drops the renderer. Must be safe to call when not connected.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Output underruns/overruns reported by the backend over the sink's lifetime.
    fn xrun_count(&self) -> usize {
        0
    }
}

/// A headless sink that renders only when pulled. Used for offline rendering and tests.
pub struct OfflineSink {
    format: SinkFormat,
    renderer: Option<FireRenderer>,
    connections: usize,
}

impl OfflineSink {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            format: SinkFormat::new(sample_rate, channels),
            renderer: None,
            connections: 0,
        }
    }

    pub fn format(&self) -> SinkFormat {
        self.format
    }

    /// Renders the next interleaved buffer. Silence when nothing is connected.
    pub fn pull(&mut self, data: &mut [f32]) {
        match self.renderer.as_mut() {
            Some(renderer) => renderer.process_buffer(data, self.format.channels as usize),
            None => data.fill(0.0),
        }
    }

    /// Pulls `frames` frames in buffers of `buffer_frames` and returns them all.
    pub fn render_frames(&mut self, frames: usize, buffer_frames: usize) -> Vec<f32> {
        let channels = self.format.channels as usize;
        let mut out = vec![0.0; frames * channels];
        for chunk in out.chunks_mut(buffer_frames.max(1) * channels) {
            self.pull(chunk);
        }
        out
    }

    /// How many times a renderer has been connected over the sink's lifetime.
    pub fn connections(&self) -> usize {
        self.connections
    }

    pub fn renderer(&self) -> Option<&FireRenderer> {
        self.renderer.as_ref()
    }
}

impl OutputSink for OfflineSink {
    fn negotiate(&mut self) -> EngineResult<SinkFormat> {
        Ok(self.format)
    }

    fn connect(&mut self, renderer: FireRenderer, format: SinkFormat) -> EngineResult<()> {
        if format != self.format {
            return Err(EngineError::config(format!(
                "offline sink runs at {:?}, got {:?}",
                self.format, format
            )));
        }
        self.renderer = Some(renderer);
        self.connections += 1;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.renderer = None;
    }

    fn is_connected(&self) -> bool {
        self.renderer.is_some()
    }
}
