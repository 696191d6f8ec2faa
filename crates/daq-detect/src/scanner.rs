//! Device scanner
//!
//! Queries the SDK for attached devices and their channel lists.

use std::sync::Arc;

use daq_sdk::{split_channel_list, ChannelKind, DaqSdk, SdkVersion};
use tracing::{info, warn};

use crate::device::Device;
use crate::error::DetectError;

/// Scanner configuration
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// Skip devices whose identifier contains any of these patterns
    pub skip_patterns: Vec<String>,
    /// Leave out devices the driver reports as simulated
    pub skip_simulated: bool,
}

/// Device scanner
pub struct DeviceScanner {
    sdk: Arc<dyn DaqSdk>,
    config: ScannerConfig,
}

impl DeviceScanner {
    /// Create a scanner with default configuration
    pub fn new(sdk: Arc<dyn DaqSdk>) -> Self {
        Self::with_config(sdk, ScannerConfig::default())
    }

    /// Create a scanner with custom configuration
    pub fn with_config(sdk: Arc<dyn DaqSdk>, config: ScannerConfig) -> Self {
        Self { sdk, config }
    }

    /// Driver version, if the driver answers
    pub fn sdk_version(&self) -> Option<SdkVersion> {
        match self.sdk.version().check("query driver version") {
            Ok(version) => Some(version),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Scan the bus
    ///
    /// Only a failure to list devices is an error; per-device query failures
    /// are logged and leave that field at its default.
    pub fn scan(&self) -> Result<Vec<Device>, DetectError> {
        info!("Scanning for DAQ devices...");
        if let Some(version) = self.sdk_version() {
            info!("Driver version {}", version);
        }

        let names = self
            .sdk
            .device_names()
            .check("enumerate devices")
            .map_err(DetectError::EnumerationFailed)?;

        let devices: Vec<Device> = split_channel_list(&names)
            .into_iter()
            .filter(|name| !self.should_skip_name(name))
            .map(|name| self.describe(name))
            .filter(|device| !(self.config.skip_simulated && device.simulated))
            .collect();

        if devices.is_empty() {
            info!("No DAQ devices found");
        } else {
            info!("Found {} DAQ device(s)", devices.len());
            for device in &devices {
                info!(
                    "  {} - {} (serial {:#010X}{})",
                    device.name,
                    device.product_type,
                    device.serial_number,
                    if device.simulated { ", simulated" } else { "" }
                );
            }
        }

        Ok(devices)
    }

    fn describe(&self, name: String) -> Device {
        let mut device = Device::new(name);

        match self.sdk.product_type(&device.name).check("query product type") {
            Ok(product) => device.product_type = product,
            Err(e) => warn!("{}: {}", device.name, e),
        }
        match self
            .sdk
            .serial_number(&device.name)
            .check("query serial number")
        {
            Ok(serial) => device.serial_number = serial,
            Err(e) => warn!("{}: {}", device.name, e),
        }
        match self
            .sdk
            .is_simulated(&device.name)
            .check("query simulated flag")
        {
            Ok(simulated) => device.simulated = simulated,
            Err(e) => warn!("{}: {}", device.name, e),
        }

        for kind in ChannelKind::ALL {
            let context = format!("list {} channels", kind);
            match self.sdk.physical_channels(&device.name, kind).check(&context) {
                Ok(list) => *device.channels_mut(kind) = split_channel_list(&list),
                Err(e) => warn!("{}: {}", device.name, e),
            }
        }

        device
    }

    fn should_skip_name(&self, name: &str) -> bool {
        self.config
            .skip_patterns
            .iter()
            .any(|pattern| name.contains(pattern.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daq_sdk::diagnostics::codes;
    use daq_sim::{SimDevice, SimFault, SimOp, SimulatedSdk};

    fn two_boards() -> Arc<SimulatedSdk> {
        Arc::new(SimulatedSdk::with_devices(vec![
            SimDevice::usb_6001("Dev1"),
            SimDevice::pcie_6321("Dev2"),
        ]))
    }

    #[test]
    fn test_scan_collects_all_lists() {
        let scanner = DeviceScanner::new(two_boards());
        let devices = scanner.scan().unwrap();

        assert_eq!(devices.len(), 2);
        let dev1 = &devices[0];
        assert_eq!(dev1.name, "Dev1");
        assert_eq!(dev1.product_type, "USB-6001");
        assert!(dev1.simulated);
        assert_eq!(dev1.analog_inputs.len(), 8);
        assert_eq!(dev1.analog_outputs, vec!["Dev1/ao0", "Dev1/ao1"]);
        assert_eq!(dev1.digital_outputs.len(), 13);
        assert_eq!(devices[1].digital_outputs.len(), 48);
    }

    #[test]
    fn test_failed_subquery_keeps_device() {
        let sim = two_boards();
        sim.inject(SimFault::on(SimOp::ProductType, "Dev2", codes::DEVICE_NOT_ACCESSIBLE));
        sim.inject(SimFault::on(SimOp::PhysicalChannels, "Dev2", codes::DEVICE_NOT_ACCESSIBLE));

        let devices = DeviceScanner::new(sim).scan().unwrap();
        assert_eq!(devices.len(), 2);

        let dev2 = &devices[1];
        assert_eq!(dev2.product_type, "");
        assert!(dev2.analog_inputs.is_empty());
        assert_eq!(dev2.serial_number, SimDevice::pcie_6321("Dev2").serial_number);
    }

    #[test]
    fn test_version_failure_does_not_abort() {
        let sim = two_boards();
        sim.inject(SimFault::always(SimOp::Version, -50_150));

        let scanner = DeviceScanner::new(sim);
        assert!(scanner.sdk_version().is_none());
        assert_eq!(scanner.scan().unwrap().len(), 2);
    }

    #[test]
    fn test_enumeration_failure_is_error() {
        let sim = two_boards();
        sim.inject(SimFault::always(SimOp::DeviceNames, -50_150));

        let err = DeviceScanner::new(sim).scan().unwrap_err();
        assert!(matches!(err, DetectError::EnumerationFailed(_)));
    }

    #[test]
    fn test_skip_patterns_and_simulated() {
        let config = ScannerConfig {
            skip_patterns: vec!["Dev2".to_string()],
            skip_simulated: false,
        };
        let devices = DeviceScanner::with_config(two_boards(), config).scan().unwrap();
        assert_eq!(devices.len(), 1);

        let config = ScannerConfig {
            skip_simulated: true,
            ..Default::default()
        };
        let devices = DeviceScanner::with_config(two_boards(), config).scan().unwrap();
        assert!(devices.is_empty());
    }
}
