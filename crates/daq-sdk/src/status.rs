//! Signed status codes and call replies

use std::fmt;

use tracing::warn;

use crate::diagnostics::error_text;
use crate::error::SdkError;

/// Signed status code returned by every SDK call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusCode(pub i32);

/// Classification of a status code by sign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Code 0: the operation completed
    Success,
    /// Positive code: the operation completed, but something is worth logging
    Warning,
    /// Negative code: the operation did not complete
    Error,
}

impl StatusCode {
    /// The success code
    pub const SUCCESS: StatusCode = StatusCode(0);

    /// Classify the code by its sign
    pub fn severity(self) -> Severity {
        match self.0 {
            0 => Severity::Success,
            c if c > 0 => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// True for code 0
    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    /// True for negative codes
    pub fn is_error(self) -> bool {
        self.0 < 0
    }

    /// Human-readable diagnostic text
    pub fn describe(self) -> &'static str {
        error_text(self.0)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of an SDK call: the status code plus whatever value the call produced
///
/// On error codes the value is whatever the SDK left behind (usually a
/// default) and must not be trusted; use [`Reply::check`] to get at it.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "SDK replies carry a status code that must be checked"]
pub struct Reply<T> {
    /// Status code returned by the call
    pub code: StatusCode,
    /// Value produced by the call
    pub value: T,
}

impl<T> Reply<T> {
    /// A successful reply
    pub fn ok(value: T) -> Self {
        Self {
            code: StatusCode::SUCCESS,
            value,
        }
    }

    /// A reply with an explicit status code
    pub fn with_code(code: StatusCode, value: T) -> Self {
        Self { code, value }
    }

    /// Apply the sign-based policy to this reply
    ///
    /// Warnings are logged and the value is returned; errors become
    /// [`SdkError::Vendor`] carrying the diagnostic text.
    pub fn check(self, context: &str) -> Result<T, SdkError> {
        match self.code.severity() {
            Severity::Success => Ok(self.value),
            Severity::Warning => {
                warn!(
                    code = self.code.0,
                    "{}: warning {}: {}",
                    context,
                    self.code,
                    self.code.describe()
                );
                Ok(self.value)
            }
            Severity::Error => Err(SdkError::Vendor {
                code: self.code,
                context: context.to_string(),
                message: self.code.describe(),
            }),
        }
    }

    /// Transform the value, keeping the status code
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        Reply {
            code: self.code,
            value: f(self.value),
        }
    }
}

impl<T: Default> Reply<T> {
    /// A reply for a call that failed with `code`
    pub fn failed(code: i32) -> Self {
        Self {
            code: StatusCode(code),
            value: T::default(),
        }
    }
}
