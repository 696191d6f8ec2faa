//! Error types for device discovery

use daq_sdk::SdkError;
use thiserror::Error;

/// Errors that can occur during discovery
#[derive(Debug, Error)]
pub enum DetectError {
    /// The device list itself could not be read
    #[error("failed to enumerate devices: {0}")]
    EnumerationFailed(#[source] SdkError),
}
