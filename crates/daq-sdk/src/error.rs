//! Error types for SDK calls

use thiserror::Error;

use crate::status::StatusCode;

/// Errors surfaced by SDK calls and physical-name handling
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// The vendor SDK returned a negative status code
    #[error("{context} failed with code {code}: {message}")]
    Vendor {
        /// Raw status code
        code: StatusCode,
        /// Operation that failed
        context: String,
        /// Diagnostic text for the code
        message: &'static str,
    },

    /// Local configuration problem (zero port width, bad line index, ...)
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SdkError {
    /// Vendor status code, if this error came from the SDK
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            SdkError::Vendor { code, .. } => Some(*code),
            SdkError::Configuration(_) => None,
        }
    }
}
