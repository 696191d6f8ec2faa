//! Error types for the I/O coordinator

use daq_sdk::SdkError;
use thiserror::Error;

use crate::state::Subsystem;

/// Errors that can occur in the coordinator
#[derive(Debug, Error)]
pub enum HubError {
    /// An SDK call or physical-name check failed
    #[error(transparent)]
    Sdk(#[from] SdkError),

    /// Start requested for a subsystem that is already running
    #[error("{0} is already running")]
    AlreadyRunning(Subsystem),

    /// Start requested for a subsystem with nothing mapped
    #[error("{0} has no channels configured")]
    NoChannels(Subsystem),

    /// Minimum voltage above maximum, or a non-finite bound
    #[error("invalid voltage limits: min {min} V, max {max} V")]
    InvalidLimits { min: f64, max: f64 },

    /// Averaging window of zero samples
    #[error("sample count must be at least 1")]
    InvalidSampleCount,

    /// Settings store could not be read or written
    #[error("settings error: {0}")]
    Settings(String),

    /// Worker thread could not be spawned
    #[error("failed to spawn worker thread: {0}")]
    Thread(#[from] std::io::Error),
}
