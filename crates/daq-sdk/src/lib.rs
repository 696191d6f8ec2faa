//! DAQ SDK Abstraction Library
//!
//! This crate describes the narrow slice of a vendor data-acquisition SDK
//! that the I/O coordinator depends on:
//!
//! - **Status codes**: every SDK call returns a signed code (0 = success,
//!   positive = warning, negative = error) wrapped in a [`Reply`]
//! - **Diagnostics**: a static code-to-text table used purely for logging
//! - **Physical names**: parsing of vendor channel lists and digital line names
//! - **Hardware tasks**: an RAII wrapper that guarantees every created task is
//!   eventually stopped and cleared, including on failed setup paths
//!
//! # Example
//!
//! ```rust
//! use daq_sdk::{DigitalLineName, StatusCode, Severity};
//!
//! let line = DigitalLineName::parse("Dev1/port0/line3").unwrap();
//! assert_eq!(line.port, "Dev1/port0");
//! assert_eq!(line.line, 3);
//!
//! assert_eq!(StatusCode(200_015).severity(), Severity::Warning);
//! assert_eq!(StatusCode(-200_088).severity(), Severity::Error);
//! ```

pub mod diagnostics;
pub mod error;
pub mod names;
pub mod sdk;
pub mod status;
pub mod task;

pub use diagnostics::error_text;
pub use error::SdkError;
pub use names::{device_of, split_channel_list, DigitalLineName};
pub use sdk::{ChannelKind, DaqSdk, SdkVersion, TaskId, VoltageRange};
pub use status::{Reply, Severity, StatusCode};
pub use task::{HardwareTask, DEFAULT_IO_TIMEOUT};
