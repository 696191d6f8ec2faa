//! DAQ Hardware I/O Coordinator
//!
//! This crate owns the mapping from caller-chosen channel handles to physical
//! channels on a data-acquisition device, and runs one polling worker per
//! subsystem to move values between those channels and the hardware.
//!
//! # Architecture
//!
//! - **IoCoordinator**: the single owner of every channel map, setpoint and
//!   worker. All mutating calls happen on its thread.
//! - **Workers**: long-lived threads, one per subsystem (analog output,
//!   analog input, digital output, laser input, laser output, discovery),
//!   each driving a [`worker::PollLoop`]
//! - **Events**: workers and the coordinator publish [`IoEvent`]s on a
//!   broadcast channel; discovery results come back as [`WorkerMessage`]s
//!
//! Output writes are coalesced: setting a voltage only stores it, and the
//! worker writes the latest value once on its next tick. Digital lines share
//! a port and are always written as a whole port word.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use daq_hub::{ChannelHandle, HubConfig, IoCoordinator, MemorySettingsStore, Persistence};
//! use daq_sim::SimulatedSdk;
//!
//! let mut hub = IoCoordinator::new(
//!     Arc::new(SimulatedSdk::new()),
//!     Box::new(MemorySettingsStore::new()),
//!     HubConfig::default(),
//! );
//! hub.startup().unwrap();
//!
//! let pump = ChannelHandle(0);
//! hub.set_output_channel(pump, "Dev1/ao0", Persistence::Persist).unwrap();
//! hub.start_analog_output().unwrap();
//! hub.set_output_voltage(pump, 2.5);
//! ```

pub mod averaging;
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod digital;
pub mod error;
pub mod events;
pub mod limits;
pub mod settings;
pub mod state;
pub mod worker;
pub mod workers;

pub use averaging::AveragingBuffer;
pub use channel::{AnalogInputChannel, AnalogOutputChannel, DigitalPort};
pub use config::{HubConfig, LaserConfig};
pub use coordinator::{IoCoordinator, LASER_HANDLE};
pub use digital::{check_lines, fail_safe_word, logical_state, physical_level, port_word, DigitalLine};
pub use error::HubError;
pub use events::{EventSink, IoEvent, PowerEvent, WorkerMessage};
pub use limits::VoltageLimits;
pub use settings::{get_parsed, keys, JsonFileStore, MemorySettingsStore, SettingsStore};
pub use state::{ChannelHandle, Persistence, Subsystem};
pub use worker::{PollLoop, StopToken, Tick, Worker, WorkerState, WorkerTiming};
