//! DAQ SDK Simulation Library
//!
//! This crate provides an in-memory [`daq_sdk::DaqSdk`] for exercising the
//! I/O coordinator without physical hardware. It includes:
//!
//! - **SimDevice**: a device description (product, serial, channel counts,
//!   digital port widths) with presets for common multifunction boards
//! - **SimulatedSdk**: task bookkeeping, queued analog input samples,
//!   recorded analog and digital writes, and status-code fault injection
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use daq_sdk::{DaqSdk, HardwareTask, VoltageRange};
//! use daq_sim::{SimDevice, SimulatedSdk};
//!
//! let sim = Arc::new(SimulatedSdk::with_devices(vec![SimDevice::usb_6001("Dev1")]));
//!
//! let mut task = HardwareTask::create(sim.clone(), "ao0").unwrap();
//! task.add_analog_output("Dev1/ao0", VoltageRange::default()).unwrap();
//! task.start().unwrap();
//! task.write_analog(1.5).unwrap();
//! drop(task);
//!
//! assert_eq!(sim.analog_writes("Dev1/ao0"), vec![1.5]);
//! assert_eq!(sim.live_tasks(), 0);
//! ```

pub mod device;
pub mod fault;
pub mod sdk;

pub use device::SimDevice;
pub use fault::{SimFault, SimOp};
pub use sdk::{AnalogWrite, DigitalWrite, SimulatedSdk};
