// src/engine/control.rs

//! Runs a [`FireEngine`] on a dedicated thread so that any thread can drive it.
//!
//! A cpal stream may not leave the thread that built it, so the sink is built
//! on the control thread and lifecycle commands reach the engine over an mpsc
//! channel. Volume skips the channel and goes straight to the shared atomics.

use super::{EngineOptions, EngineStatus, FireEngine, VolumeHandle};
use crate::error::{EngineError, EngineResult};
use crate::sink::OutputSink;
use crate::soundscape::FireTuning;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub enum EngineCommand {
    Start,
    Stop,
    Restart,
    SetSoundscape(String),
    SetTuning(FireTuning),
    Status,
}

enum Request {
    Command {
        command: EngineCommand,
        reply: Sender<EngineResult<EngineStatus>>,
    },
    Shutdown,
}

fn thread_gone() -> EngineError {
    EngineError::ControlThread("engine control thread has exited".to_string())
}

/// Cloneable, `Send` handle for driving an engine owned by an [`EngineThread`].
///
/// Every lifecycle call blocks until the control thread has applied it and
/// returns the engine status that resulted.
#[derive(Debug, Clone)]
pub struct EngineController {
    requests: Sender<Request>,
    volume: VolumeHandle,
}

impl EngineController {
    pub fn start(&self) -> EngineResult<EngineStatus> {
        self.send(EngineCommand::Start)
    }

    pub fn stop(&self) -> EngineResult<EngineStatus> {
        self.send(EngineCommand::Stop)
    }

    pub fn restart(&self) -> EngineResult<EngineStatus> {
        self.send(EngineCommand::Restart)
    }

    pub fn set_soundscape(&self, id: &str) -> EngineResult<EngineStatus> {
        self.send(EngineCommand::SetSoundscape(id.to_string()))
    }

    pub fn set_tuning(&self, tuning: FireTuning) -> EngineResult<EngineStatus> {
        self.send(EngineCommand::SetTuning(tuning))
    }

    pub fn status(&self) -> EngineResult<EngineStatus> {
        self.send(EngineCommand::Status)
    }

    /// Does not go through the control thread.
    pub fn set_master_volume(&self, volume: f32) -> f32 {
        self.volume.set(volume)
    }

    pub fn master_volume(&self) -> f32 {
        self.volume.get()
    }

    pub fn send(&self, command: EngineCommand) -> EngineResult<EngineStatus> {
        let (reply, response) = mpsc::channel();
        self.requests
            .send(Request::Command { command, reply })
            .map_err(|_| thread_gone())?;
        response.recv().map_err(|_| thread_gone())?
    }
}

/// Owns the control thread. Dropping it stops the engine and joins the thread.
pub struct EngineThread {
    controller: EngineController,
    thread_handle: Option<JoinHandle<()>>,
}

impl EngineThread {
    /// Spawns the control thread, builds the sink there with `make_sink` and
    /// returns once the engine exists. The engine starts out `Stopped`.
    pub fn spawn<S, F>(make_sink: F, options: EngineOptions) -> EngineResult<Self>
    where
        S: OutputSink + 'static,
        F: FnOnce() -> S + Send + 'static,
    {
        let (requests, incoming) = mpsc::channel::<Request>();
        let (ready_tx, ready_rx) = mpsc::channel::<VolumeHandle>();

        let thread_handle = thread::Builder::new()
            .name("emberglow-control".to_string())
            .spawn(move || {
                let mut engine = FireEngine::new(make_sink(), options);
                if ready_tx.send(engine.volume_handle()).is_err() {
                    return;
                }
                run_commands(&mut engine, incoming);
                engine.stop();
                debug!("engine control thread finished");
            })
            .map_err(|e| EngineError::ControlThread(format!("failed to spawn control thread: {e}")))?;

        let volume = ready_rx.recv().map_err(|_| thread_gone())?;
        Ok(Self {
            controller: EngineController { requests, volume },
            thread_handle: Some(thread_handle),
        })
    }

    pub fn controller(&self) -> EngineController {
        self.controller.clone()
    }

    /// Stops the engine and waits for the control thread to exit.
    /// Controllers still held elsewhere get `ControlThread` errors afterwards.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            // A send error only means the thread is already gone.
            let _ = self.controller.requests.send(Request::Shutdown);
            if let Err(e) = handle.join() {
                error!("engine control thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for EngineThread {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_commands<S: OutputSink>(engine: &mut FireEngine<S>, incoming: Receiver<Request>) {
    while let Ok(request) = incoming.recv() {
        let (command, reply) = match request {
            Request::Command { command, reply } => (command, reply),
            Request::Shutdown => break,
        };
        debug!("control command {:?}", command);
        let result = match command {
            EngineCommand::Start => engine.start(),
            EngineCommand::Stop => {
                engine.stop();
                Ok(())
            }
            EngineCommand::Restart => engine.restart(),
            EngineCommand::SetSoundscape(id) => engine.set_soundscape(&id),
            EngineCommand::SetTuning(tuning) => {
                engine.set_tuning(tuning);
                Ok(())
            }
            EngineCommand::Status => Ok(()),
        };
        // The caller may have given up waiting; the command still took effect.
        let _ = reply.send(result.map(|()| engine.status()));
    }
}
