//! Discovered device model

use daq_sdk::{ChannelKind, DigitalLineName};
use serde::{Deserialize, Serialize};

/// A device found by a scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Device identifier (e.g., Dev1)
    pub name: String,
    /// Product type reported by the driver
    pub product_type: String,
    pub serial_number: u32,
    /// Whether the driver reports this as a simulated device
    pub simulated: bool,
    pub analog_inputs: Vec<String>,
    pub analog_outputs: Vec<String>,
    pub digital_inputs: Vec<String>,
    pub digital_outputs: Vec<String>,
}

impl Device {
    /// An empty device record, filled in by the scanner
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Physical channel names of one direction
    pub fn channels(&self, kind: ChannelKind) -> &[String] {
        match kind {
            ChannelKind::AnalogInput => &self.analog_inputs,
            ChannelKind::AnalogOutput => &self.analog_outputs,
            ChannelKind::DigitalInput => &self.digital_inputs,
            ChannelKind::DigitalOutput => &self.digital_outputs,
        }
    }

    pub(crate) fn channels_mut(&mut self, kind: ChannelKind) -> &mut Vec<String> {
        match kind {
            ChannelKind::AnalogInput => &mut self.analog_inputs,
            ChannelKind::AnalogOutput => &mut self.analog_outputs,
            ChannelKind::DigitalInput => &mut self.digital_inputs,
            ChannelKind::DigitalOutput => &mut self.digital_outputs,
        }
    }

    /// Distinct digital output ports, in line order
    pub fn digital_output_ports(&self) -> Vec<String> {
        let mut ports: Vec<String> = Vec::new();
        for line in &self.digital_outputs {
            if let Ok(parsed) = DigitalLineName::parse(line) {
                if !ports.contains(&parsed.port) {
                    ports.push(parsed.port);
                }
            }
        }
        ports
    }

    /// Whether any list of this device contains `physical`
    pub fn has_channel(&self, physical: &str) -> bool {
        ChannelKind::ALL
            .iter()
            .any(|kind| self.channels(*kind).iter().any(|c| c == physical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> Device {
        Device {
            digital_outputs: vec![
                "Dev1/port0/line0".into(),
                "Dev1/port0/line1".into(),
                "Dev1/port1/line0".into(),
            ],
            analog_outputs: vec!["Dev1/ao0".into()],
            ..Device::new("Dev1")
        }
    }

    #[test]
    fn test_digital_output_ports() {
        assert_eq!(device().digital_output_ports(), vec!["Dev1/port0", "Dev1/port1"]);
    }

    #[test]
    fn test_has_channel() {
        let dev = device();
        assert!(dev.has_channel("Dev1/ao0"));
        assert!(dev.has_channel("Dev1/port1/line0"));
        assert!(!dev.has_channel("Dev1/ai0"));
        assert_eq!(dev.channels(ChannelKind::AnalogInput).len(), 0);
    }
}
