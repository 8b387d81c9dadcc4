// src/engine.rs

//! Control plane: start/stop/volume/soundscape for the fire.
//!
//! `FireEngine` is owned by one control thread. Other threads adjust the volume
//! through a [`VolumeHandle`] and send lifecycle commands through a
//! [`control::EngineController`]. Every transition leaves the engine either fully
//! `Running` (renderer connected, scheduler armed) or fully `Stopped`.

pub mod control;

use crate::audio_engine::crackle_scheduler::CrackleScheduler;
use crate::audio_engine::{crackle_queue, EngineControls, FireRenderer};
use crate::error::EngineResult;
use crate::sink::{OutputSink, SinkFormat};
use crate::soundscape::{FireTuning, Soundscape};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Thread-safe volume control for the running (or next) session.
#[derive(Debug, Clone)]
pub struct VolumeHandle {
    controls: Arc<EngineControls>,
}

impl VolumeHandle {
    /// Clamps to [0, 1]; audible from the next rendered buffer.
    pub fn set(&self, volume: f32) -> f32 {
        self.controls.set_master_volume(volume)
    }

    pub fn get(&self) -> f32 {
        self.controls.master_volume()
    }
}

/// Snapshot of the engine, as reported back to remote callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    pub state: EngineState,
    pub soundscape: Soundscape,
    pub format: Option<SinkFormat>,
    pub master_volume: f32,
    pub crackle_triggers_sent: usize,
    pub xrun_count: usize,
}

/// Everything the engine needs besides its sink.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub tuning: FireTuning,
    pub soundscape: Soundscape,
    pub master_volume: Option<f32>,
    /// Fixed seed for both random streams. `None` draws from OS entropy on every start.
    pub seed: Option<u64>,
}

pub struct FireEngine<S: OutputSink> {
    sink: S,
    tuning: FireTuning,
    soundscape: Soundscape,
    seed: Option<u64>,
    controls: Arc<EngineControls>,
    state: EngineState,
    scheduler: Option<CrackleScheduler>,
    last_session_triggers: usize,
    format: Option<SinkFormat>,
}

impl<S: OutputSink> FireEngine<S> {
    pub fn new(sink: S, options: EngineOptions) -> Self {
        Self {
            sink,
            tuning: options.tuning,
            soundscape: options.soundscape,
            seed: options.seed,
            controls: Arc::new(EngineControls::new(options.master_volume.unwrap_or(1.0))),
            state: EngineState::Stopped,
            scheduler: None,
            last_session_triggers: 0,
            format: None,
        }
    }

    /// Starts rendering. A no-op when already running.
    ///
    /// On error nothing stays connected or armed and the engine is `Stopped`.
    pub fn start(&mut self) -> EngineResult<()> {
        if self.state == EngineState::Running {
            debug!("start() ignored, engine already running");
            return Ok(());
        }
        debug_assert_eq!(self.state, EngineState::Stopped, "start() from a transitional state");

        self.state = EngineState::Starting;
        match self.try_start() {
            Ok((scheduler, format)) => {
                self.scheduler = Some(scheduler);
                self.format = Some(format);
                self.state = EngineState::Running;
                info!(
                    "{} soundscape running at {} Hz, {} channel(s)",
                    self.soundscape, format.sample_rate, format.channels
                );
                Ok(())
            }
            Err(e) => {
                error!("failed to start engine: {}", e);
                self.sink.disconnect();
                self.state = EngineState::Stopped;
                Err(e)
            }
        }
    }

    fn try_start(&mut self) -> EngineResult<(CrackleScheduler, SinkFormat)> {
        let format = self.sink.negotiate()?;
        format.validate()?;
        let sample_rate = format.sample_rate as f32;
        self.tuning.validate(sample_rate)?;

        let (crackle_tx, crackle_rx) = crackle_queue();
        let renderer = FireRenderer::new(
            sample_rate,
            &self.tuning,
            self.controls.clone(),
            crackle_rx,
            self.seed,
        );
        self.sink.connect(renderer, format)?;

        // Dropping a scheduler that failed to spawn leaves nothing behind; the caller disconnects the sink.
        let scheduler = CrackleScheduler::arm(crackle_tx, self.tuning.crackle, self.seed)?;
        Ok((scheduler, format))
    }

    /// Stops rendering and releases the session. A no-op when already stopped.
    pub fn stop(&mut self) {
        if self.state == EngineState::Stopped {
            debug!("stop() ignored, engine already stopped");
            return;
        }
        self.state = EngineState::Stopping;
        if let Some(scheduler) = self.scheduler.take() {
            self.last_session_triggers = scheduler.disarm();
        }
        self.sink.disconnect();
        self.format = None;
        self.state = EngineState::Stopped;
        info!("engine stopped");
    }

    /// Stop, settle, start. Rendering resumes from fresh phases and filter memory.
    pub fn restart(&mut self) -> EngineResult<()> {
        self.stop();
        thread::sleep(Duration::from_millis(self.tuning.settle_millis));
        self.start()
    }

    pub fn set_master_volume(&self, volume: f32) -> f32 {
        self.controls.set_master_volume(volume)
    }

    pub fn master_volume(&self) -> f32 {
        self.controls.master_volume()
    }

    pub fn volume_handle(&self) -> VolumeHandle {
        VolumeHandle {
            controls: self.controls.clone(),
        }
    }

    /// Selects a soundscape by id. Unchanged selections are a no-op; a change while
    /// running restarts the engine so the new soundscape begins from silence.
    pub fn set_soundscape(&mut self, id: &str) -> EngineResult<()> {
        let requested = id.parse::<Soundscape>().map_err(|e| {
            warn!("{}", e);
            e
        })?;
        if requested == self.soundscape {
            return Ok(());
        }
        self.soundscape = requested;
        if self.state == EngineState::Running {
            self.restart()?;
        }
        Ok(())
    }

    /// Replaces the tuning. Takes effect on the next start.
    pub fn set_tuning(&mut self, tuning: FireTuning) {
        self.tuning = tuning;
    }

    pub fn soundscape(&self) -> Soundscape {
        self.soundscape
    }

    pub fn tuning(&self) -> &FireTuning {
        &self.tuning
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Format negotiated for the current session.
    pub fn format(&self) -> Option<SinkFormat> {
        self.format
    }

    /// Crackles queued in the current session, or in the last one once stopped.
    pub fn crackle_triggers_sent(&self) -> usize {
        self.scheduler
            .as_ref()
            .map_or(self.last_session_triggers, |s| s.triggers_sent())
    }

    pub fn xrun_count(&self) -> usize {
        self.sink.xrun_count()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state,
            soundscape: self.soundscape,
            format: self.format,
            master_volume: self.master_volume(),
            crackle_triggers_sent: self.crackle_triggers_sent(),
            xrun_count: self.xrun_count(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: OutputSink> Drop for FireEngine<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
