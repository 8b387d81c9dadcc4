//! Procedural ambient fire: pink-noise hiss, breathing modulation, a low
//! harmonic hum and random crackles, synthesized sample by sample.

pub mod audio_device;
pub mod audio_engine;
pub mod audio_io;
pub mod engine;
pub mod error;
pub mod fire_components;
pub mod settings;
pub mod sink;
pub mod soundscape;

pub use audio_engine::{EngineControls, FireRenderer};
pub use audio_io::{CpalSink, CpalSinkConfig};
pub use engine::control::{EngineCommand, EngineController, EngineThread};
pub use engine::{EngineOptions, EngineState, EngineStatus, FireEngine, VolumeHandle};
pub use error::{EngineError, EngineResult};
pub use fire_components::CrackleEvent;
pub use sink::{OfflineSink, OutputSink, SinkFormat};
pub use soundscape::{FireTuning, Soundscape};
