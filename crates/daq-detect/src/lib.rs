//! DAQ Device Discovery Library
//!
//! This crate scans the vendor SDK for attached data-acquisition devices and
//! collects, per device, its identification and the physical channel names
//! available in each direction.
//!
//! A failing query for one device never aborts the scan: the failure is
//! logged and that field keeps its default.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use daq_detect::DeviceScanner;
//! use daq_sim::SimulatedSdk;
//!
//! let scanner = DeviceScanner::new(Arc::new(SimulatedSdk::new()));
//! let devices = scanner.scan().unwrap();
//!
//! for device in devices {
//!     println!("Found {} ({})", device.name, device.product_type);
//! }
//! ```

pub mod device;
pub mod error;
pub mod scanner;

pub use device::Device;
pub use error::DetectError;
pub use scanner::{DeviceScanner, ScannerConfig};
