// src/error.rs

use thiserror::Error;

/// Everything that can go wrong on the control plane. The render callback has no error path.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// The sink or tuning cannot be configured as requested.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported soundscape '{0}'")]
    UnsupportedSoundscape(String),

    /// Device missing, stream could not be built or started.
    #[error("audio hardware error: {0}")]
    Hardware(String),

    #[error("crackle scheduler error: {0}")]
    Scheduler(String),

    /// The engine's control thread could not be spawned or has already exited.
    #[error("engine control thread error: {0}")]
    ControlThread(String),
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Configuration(msg.into())
    }

    pub fn hardware(msg: impl Into<String>) -> Self {
        EngineError::Hardware(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
