//! The vendor SDK surface

use std::fmt;
use std::time::Duration;

use crate::status::Reply;

/// Opaque vendor task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Direction-keyed physical channel category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelKind {
    AnalogInput,
    AnalogOutput,
    DigitalInput,
    DigitalOutput,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::AnalogInput,
        ChannelKind::AnalogOutput,
        ChannelKind::DigitalInput,
        ChannelKind::DigitalOutput,
    ];
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChannelKind::AnalogInput => "analog input",
            ChannelKind::AnalogOutput => "analog output",
            ChannelKind::DigitalInput => "digital input",
            ChannelKind::DigitalOutput => "digital output",
        };
        f.write_str(label)
    }
}

/// SDK version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SdkVersion {
    pub major: u32,
    pub minor: u32,
    pub update: u32,
}

impl fmt::Display for SdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.update)
    }
}

/// Voltage range used when creating analog channels
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoltageRange {
    pub min: f64,
    pub max: f64,
}

impl VoltageRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the range
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

impl Default for VoltageRange {
    fn default() -> Self {
        Self {
            min: -10.0,
            max: 10.0,
        }
    }
}

/// Vendor data-acquisition SDK
///
/// Every call returns a [`Reply`] whose status code follows the sign rule
/// (0 success, positive warning, negative error). Implementations must be
/// callable from the coordinator thread and from worker threads at once.
pub trait DaqSdk: Send + Sync {
    /// Driver version
    fn version(&self) -> Reply<SdkVersion>;

    /// Comma-delimited list of attached device identifiers
    fn device_names(&self) -> Reply<String>;

    fn product_type(&self, device: &str) -> Reply<String>;

    fn serial_number(&self, device: &str) -> Reply<u32>;

    fn is_simulated(&self, device: &str) -> Reply<bool>;

    /// Comma-delimited list of physical channels of `kind` on `device`
    fn physical_channels(&self, device: &str, kind: ChannelKind) -> Reply<String>;

    fn create_task(&self, name: &str) -> Reply<TaskId>;

    fn start_task(&self, task: TaskId) -> Reply<()>;

    fn stop_task(&self, task: TaskId) -> Reply<()>;

    fn clear_task(&self, task: TaskId) -> Reply<()>;

    fn create_analog_output_channel(
        &self,
        task: TaskId,
        physical: &str,
        range: VoltageRange,
    ) -> Reply<()>;

    fn create_analog_input_channel(
        &self,
        task: TaskId,
        physical: &str,
        range: VoltageRange,
    ) -> Reply<()>;

    /// Create a digital output channel covering every line of `port`
    fn create_digital_output_channel(&self, task: TaskId, port: &str) -> Reply<()>;

    fn write_analog_scalar(&self, task: TaskId, value: f64, timeout: Duration) -> Reply<()>;

    fn read_analog_scalar(&self, task: TaskId, timeout: Duration) -> Reply<f64>;

    /// Write one 32-bit word to the task's digital port
    fn write_digital_port(&self, task: TaskId, word: u32, timeout: Duration) -> Reply<()>;

    /// Number of lines on a digital port
    fn digital_port_width(&self, port: &str) -> Reply<u32>;
}
