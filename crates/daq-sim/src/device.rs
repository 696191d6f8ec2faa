//! Simulated device descriptions

use daq_sdk::ChannelKind;
use serde::{Deserialize, Serialize};

/// A simulated multifunction DAQ board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimDevice {
    /// Device identifier (`Dev1`)
    pub name: String,
    pub product_type: String,
    pub serial_number: u32,
    /// Number of analog input channels (`ai0..`)
    pub analog_inputs: u32,
    /// Number of analog output channels (`ao0..`)
    pub analog_outputs: u32,
    /// Line count of each digital port (`port0..`)
    pub digital_ports: Vec<u32>,
    /// Output range accepted by analog writes
    #[serde(default = "default_output_limit")]
    pub output_limit: f64,
}

fn default_output_limit() -> f64 {
    10.0
}

impl SimDevice {
    /// Low-cost USB board: 8 AI, 2 AO, ports of 8, 4 and 1 lines
    pub fn usb_6001(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product_type: "USB-6001".to_string(),
            serial_number: 0x01A2_B3C4,
            analog_inputs: 8,
            analog_outputs: 2,
            digital_ports: vec![8, 4, 1],
            output_limit: 10.0,
        }
    }

    /// PCIe board: 16 AI, 2 AO, one 32-line port and two 8-line ports
    pub fn pcie_6321(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product_type: "PCIe-6321".to_string(),
            serial_number: 0x0203_0405,
            analog_inputs: 16,
            analog_outputs: 2,
            digital_ports: vec![32, 8, 8],
            output_limit: 10.0,
        }
    }

    /// Physical port names (`Dev1/port0`, ...)
    pub fn port_names(&self) -> Vec<String> {
        (0..self.digital_ports.len())
            .map(|p| format!("{}/port{}", self.name, p))
            .collect()
    }

    /// Line count of `port`, if it belongs to this device
    pub fn port_width(&self, port: &str) -> Option<u32> {
        let index = port
            .strip_prefix(&self.name)?
            .strip_prefix("/port")?
            .parse::<usize>()
            .ok()?;
        self.digital_ports.get(index).copied()
    }

    /// Physical names of every channel of `kind`
    pub fn channels(&self, kind: ChannelKind) -> Vec<String> {
        match kind {
            ChannelKind::AnalogInput => (0..self.analog_inputs)
                .map(|i| format!("{}/ai{}", self.name, i))
                .collect(),
            ChannelKind::AnalogOutput => (0..self.analog_outputs)
                .map(|i| format!("{}/ao{}", self.name, i))
                .collect(),
            // Lines are bidirectional
            ChannelKind::DigitalInput | ChannelKind::DigitalOutput => self
                .digital_ports
                .iter()
                .enumerate()
                .flat_map(|(p, width)| {
                    (0..*width).map(move |l| format!("{}/port{}/line{}", self.name, p, l))
                })
                .collect(),
        }
    }

    /// Whether `physical` names a channel of `kind` on this device
    pub fn has_channel(&self, kind: ChannelKind, physical: &str) -> bool {
        self.channels(kind).iter().any(|c| c == physical)
    }
}
