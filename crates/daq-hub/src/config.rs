//! Coordinator configuration

use std::time::Duration;

use daq_sdk::VoltageRange;
use serde::{Deserialize, Serialize};

use crate::limits::VoltageLimits;

/// Physical channels reserved for the laser subsystem
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaserConfig {
    /// Analog input sampled by the laser input worker
    pub input_channel: String,
    /// Analog output driven by the laser output worker
    pub output_channel: String,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            input_channel: "Dev1/ai7".to_string(),
            output_channel: "Dev1/ao1".to_string(),
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubConfig {
    /// Sleep between worker ticks (ms)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Number of polls while waiting for a worker to stop
    #[serde(default = "default_stop_retries")]
    pub stop_retries: u32,
    /// Delay between stop polls (ms)
    #[serde(default = "default_stop_retry_interval_ms")]
    pub stop_retry_interval_ms: u64,
    /// Timeout passed to scalar reads and writes (ms)
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
    /// Persisted analog mapping slots per direction
    #[serde(default = "default_analog_slots")]
    pub analog_slots: u32,
    /// Persisted digital mapping slots
    #[serde(default = "default_digital_slots")]
    pub digital_slots: u32,
    /// Output limits used until the settings store provides some
    #[serde(default)]
    pub default_limits: VoltageLimits,
    /// Averaging window used until the settings store provides one
    #[serde(default = "default_sample_count")]
    pub default_sample_count: usize,
    /// Hardware range of analog input channels
    #[serde(default)]
    pub input_range: VoltageRange,
    /// Hardware range of analog output channels
    #[serde(default)]
    pub output_range: VoltageRange,
    /// Publish running means instead of raw samples
    #[serde(default)]
    pub use_average: bool,
    /// Event channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default)]
    pub laser: LaserConfig,
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_stop_retries() -> u32 {
    100
}

fn default_stop_retry_interval_ms() -> u64 {
    10
}

fn default_io_timeout_ms() -> u64 {
    1000
}

fn default_analog_slots() -> u32 {
    4
}

fn default_digital_slots() -> u32 {
    9
}

fn default_sample_count() -> usize {
    10
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            stop_retries: default_stop_retries(),
            stop_retry_interval_ms: default_stop_retry_interval_ms(),
            io_timeout_ms: default_io_timeout_ms(),
            analog_slots: default_analog_slots(),
            digital_slots: default_digital_slots(),
            default_limits: VoltageLimits::default(),
            default_sample_count: default_sample_count(),
            input_range: VoltageRange::default(),
            output_range: VoltageRange::default(),
            use_average: false,
            event_capacity: default_event_capacity(),
            laser: LaserConfig::default(),
        }
    }
}

impl HubConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn stop_retry_interval(&self) -> Duration {
        Duration::from_millis(self.stop_retry_interval_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Longest a stop waits before detaching the worker
    pub fn stop_budget(&self) -> Duration {
        self.stop_retry_interval() * self.stop_retries
    }
}
