// src/audio_io.rs

use crate::audio_device;
use crate::audio_engine::tone_shaper::ToneShaper;
use crate::audio_engine::FireRenderer;
use crate::error::{EngineError, EngineResult};
use crate::sink::{OutputSink, SinkFormat};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize, BuildStreamError, Device, FromSample, Sample, SampleFormat, Stream, StreamConfig,
    SupportedBufferSize, SupportedStreamConfigRange,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Largest block rendered in one go inside the callback. Bigger device buffers are split.
const MAX_BUFFER_SIZE: usize = 2048;

/// Where and how to open the output stream. `None` means "use the device default".
#[derive(Debug, Clone, Default)]
pub struct CpalSinkConfig {
    pub host_name: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: Option<u32>,
    pub buffer_size: Option<u32>,
    /// Run the warmth EQ + reverb stage after the engine.
    pub tone_shaping: bool,
}

/// What the sink needs to know about one of the device's supported config ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SupportedRange {
    channels: u16,
    sample_format: SampleFormat,
    min_sample_rate: u32,
    max_sample_rate: u32,
    /// `None` when the backend does not report buffer limits.
    buffer_size: Option<(u32, u32)>,
}

impl From<&SupportedStreamConfigRange> for SupportedRange {
    fn from(range: &SupportedStreamConfigRange) -> Self {
        Self {
            channels: range.channels(),
            sample_format: range.sample_format(),
            min_sample_rate: range.min_sample_rate().0,
            max_sample_rate: range.max_sample_rate().0,
            buffer_size: match range.buffer_size() {
                SupportedBufferSize::Range { min, max } => Some((*min, *max)),
                SupportedBufferSize::Unknown => None,
            },
        }
    }
}

/// Checks a requested rate and buffer size against what the device reports.
///
/// Ranges matching the stream's channel count and sample format are preferred.
/// A device that reports nothing cannot be checked and is let through.
fn check_stream_request(
    ranges: &[SupportedRange],
    channels: u16,
    sample_format: SampleFormat,
    sample_rate: u32,
    buffer_size: Option<u32>,
) -> EngineResult<()> {
    let layout_matches: Vec<&SupportedRange> = ranges
        .iter()
        .filter(|r| r.channels == channels && r.sample_format == sample_format)
        .collect();
    let candidates: Vec<&SupportedRange> = if layout_matches.is_empty() {
        ranges.iter().collect()
    } else {
        layout_matches
    };
    if candidates.is_empty() {
        return Ok(());
    }

    let rate_matches: Vec<&&SupportedRange> = candidates
        .iter()
        .filter(|r| sample_rate >= r.min_sample_rate && sample_rate <= r.max_sample_rate)
        .collect();
    if rate_matches.is_empty() {
        let supported: Vec<String> = candidates
            .iter()
            .map(|r| format!("{}-{} Hz", r.min_sample_rate, r.max_sample_rate))
            .collect();
        return Err(EngineError::config(format!(
            "sample rate {} Hz is not supported by the output device (supports {})",
            sample_rate,
            supported.join(", ")
        )));
    }

    if let Some(bs) = buffer_size {
        let fits = rate_matches.iter().any(|r| match r.buffer_size {
            Some((min, max)) => bs >= min && bs <= max,
            None => true,
        });
        if !fits {
            return Err(EngineError::config(format!(
                "buffer size {} is not supported by the output device at {} Hz",
                bs, sample_rate
            )));
        }
    }
    Ok(())
}

/// A stream the backend refuses to configure is a configuration problem; anything else is hardware.
fn classify_build_error(err: BuildStreamError) -> EngineError {
    match err {
        BuildStreamError::StreamConfigNotSupported | BuildStreamError::InvalidArgument => {
            EngineError::config(format!("Output stream rejected the requested config: {}", err))
        }
        other => EngineError::hardware(format!("Failed to build output stream: {}", other)),
    }
}

struct Negotiated {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
}

/// Plays the engine through a cpal output stream.
pub struct CpalSink {
    config: CpalSinkConfig,
    negotiated: Option<Negotiated>,
    stream: Option<Stream>,
    xrun_count: Arc<AtomicUsize>,
}

impl CpalSink {
    pub fn new(config: CpalSinkConfig) -> Self {
        Self {
            config,
            negotiated: None,
            stream: None,
            xrun_count: Arc::new(AtomicUsize::new(0)),
        }
    }

}

impl OutputSink for CpalSink {
    fn negotiate(&mut self) -> EngineResult<SinkFormat> {
        let host = audio_device::get_host(self.config.host_name.as_deref())?;
        let device = audio_device::find_output_device(&host, self.config.output_device.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
        info!("Using output device: {}", device_name);

        let default_config = device.default_output_config().map_err(|e| {
            EngineError::config(format!("No usable output config on '{}': {}", device_name, e))
        })?;
        let sample_format = default_config.sample_format();

        let mut config: StreamConfig = default_config.into();
        if let Some(sr) = self.config.sample_rate {
            config.sample_rate = cpal::SampleRate(sr);
        }
        if let Some(bs) = self.config.buffer_size {
            config.buffer_size = BufferSize::Fixed(bs);
        }

        if self.config.sample_rate.is_some() || self.config.buffer_size.is_some() {
            let ranges: Vec<SupportedRange> = match device.supported_output_configs() {
                Ok(configs) => configs.map(|range| SupportedRange::from(&range)).collect(),
                Err(e) => {
                    debug!("could not query supported configs on '{}': {}", device_name, e);
                    Vec::new()
                }
            };
            check_stream_request(
                &ranges,
                config.channels,
                sample_format,
                config.sample_rate.0,
                self.config.buffer_size,
            )?;
        }

        let format = SinkFormat::new(config.sample_rate.0, config.channels);
        self.negotiated = Some(Negotiated {
            device,
            config,
            sample_format,
        });
        Ok(format)
    }

    fn connect(&mut self, renderer: FireRenderer, format: SinkFormat) -> EngineResult<()> {
        let Negotiated {
            device,
            config,
            sample_format,
        } = self
            .negotiated
            .take()
            .ok_or_else(|| EngineError::config("connect() called before negotiate()"))?;
        if format != SinkFormat::new(config.sample_rate.0, config.channels) {
            return Err(EngineError::config(format!(
                "format {:?} does not match the negotiated stream",
                format
            )));
        }

        let shaper = self
            .config
            .tone_shaping
            .then(|| ToneShaper::new(format.sample_rate as f32));
        let xrun_count = self.xrun_count.clone();

        let stream = match sample_format {
            SampleFormat::F32 => build_output_stream::<f32>(&device, &config, renderer, shaper, xrun_count)?,
            SampleFormat::I16 => build_output_stream::<i16>(&device, &config, renderer, shaper, xrun_count)?,
            SampleFormat::U16 => build_output_stream::<u16>(&device, &config, renderer, shaper, xrun_count)?,
            other => {
                return Err(EngineError::config(format!("Unsupported sample format {}", other)))
            }
        };
        stream
            .play()
            .map_err(|e| EngineError::hardware(format!("Failed to start output stream: {}", e)))?;

        let active_bs = match config.buffer_size {
            BufferSize::Fixed(size) => size,
            BufferSize::Default => 512, // A reasonable assumption if default
        };
        info!(
            "Successfully started stream with Sample Rate: {} Hz, Buffer Size: {} Samples, Channels: {}",
            config.sample_rate.0, active_bs, config.channels
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.negotiated = None;
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("pausing output stream failed: {}", e);
            }
            // Dropping the stream detaches the callback and frees the renderer with it.
            drop(stream);
            debug!("output stream closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn xrun_count(&self) -> usize {
        self.xrun_count.load(Ordering::Relaxed)
    }
}

fn build_output_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut renderer: FireRenderer,
    mut shaper: Option<ToneShaper>,
    xrun_count: Arc<AtomicUsize>,
) -> EngineResult<Stream>
where
    T: Sample + cpal::SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let err_fn = move |err| {
        error!("an error occurred on output stream: {}", err);
        xrun_count.fetch_add(1, Ordering::Relaxed);
    };
    // Allocated here so the callback never has to.
    let mut mono_buffer: Vec<f32> = vec![0.0; MAX_BUFFER_SIZE];

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for out_chunk in data.chunks_mut(MAX_BUFFER_SIZE * channels) {
                    let frames = out_chunk.len() / channels;
                    let mono = &mut mono_buffer[..frames];
                    renderer.process_buffer(mono, 1);
                    if let Some(shaper) = shaper.as_mut() {
                        shaper.process_buffer(mono);
                    }
                    for (frame, &sample_value) in out_chunk.chunks_mut(channels).zip(mono.iter()) {
                        for sample in frame.iter_mut() {
                            *sample = T::from_sample(sample_value);
                        }
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(classify_build_error)?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(channels: u16, min: u32, max: u32, buffer_size: Option<(u32, u32)>) -> SupportedRange {
        SupportedRange {
            channels,
            sample_format: SampleFormat::F32,
            min_sample_rate: min,
            max_sample_rate: max,
            buffer_size,
        }
    }

    #[test]
    fn test_supported_rate_passes() {
        let ranges = [range(2, 44_100, 48_000, Some((64, 4096)))];
        assert!(check_stream_request(&ranges, 2, SampleFormat::F32, 48_000, Some(256)).is_ok());
    }

    #[test]
    fn test_unsupported_rate_is_a_config_error() {
        let ranges = [range(2, 44_100, 48_000, None), range(2, 96_000, 96_000, None)];
        let err = check_stream_request(&ranges, 2, SampleFormat::F32, 12_345, None).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)), "{err:?}");
    }

    #[test]
    fn test_rate_is_checked_against_the_stream_layout() {
        // Only the mono range covers 22.05 kHz; the stereo stream must not borrow it.
        let ranges = [range(1, 8_000, 22_050, None), range(2, 44_100, 48_000, None)];
        let err = check_stream_request(&ranges, 2, SampleFormat::F32, 22_050, None).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_buffer_size_outside_range_is_a_config_error() {
        let ranges = [range(2, 44_100, 48_000, Some((64, 1024)))];
        let err = check_stream_request(&ranges, 2, SampleFormat::F32, 44_100, Some(8192)).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_unknown_limits_are_let_through() {
        assert!(check_stream_request(&[], 2, SampleFormat::F32, 12_345, Some(7)).is_ok());
        let ranges = [range(2, 44_100, 48_000, None)];
        assert!(check_stream_request(&ranges, 2, SampleFormat::F32, 44_100, Some(7)).is_ok());
    }

    #[test]
    fn test_build_errors_are_classified() {
        assert!(matches!(
            classify_build_error(BuildStreamError::StreamConfigNotSupported),
            EngineError::Configuration(_)
        ));
        assert!(matches!(
            classify_build_error(BuildStreamError::InvalidArgument),
            EngineError::Configuration(_)
        ));
        assert!(matches!(
            classify_build_error(BuildStreamError::DeviceNotAvailable),
            EngineError::Hardware(_)
        ));
    }
}
