//! Console configuration

use std::path::{Path, PathBuf};

use anyhow::Context;
use daq_hub::HubConfig;
use daq_sim::SimDevice;
use serde::{Deserialize, Serialize};

/// Contents of `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Coordinator timing, limits and slot counts
    #[serde(default)]
    pub hub: HubConfig,
    /// Devices attached to the simulated driver
    #[serde(default = "default_devices")]
    pub simulated_devices: Vec<SimDevice>,
    /// Interval at which worker messages are applied
    #[serde(default = "default_pump_ms")]
    pub pump_interval_ms: u64,
    /// Print every sampled input value, not just lifecycle events
    #[serde(default)]
    pub show_values: bool,
}

fn default_devices() -> Vec<SimDevice> {
    vec![SimDevice::usb_6001("Dev1")]
}

fn default_pump_ms() -> u64 {
    50
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            hub: HubConfig::default(),
            simulated_devices: default_devices(),
            pump_interval_ms: default_pump_ms(),
            show_values: false,
        }
    }
}

impl ConsoleConfig {
    /// Get the XDG config directory for daqhub
    /// Uses $XDG_CONFIG_HOME/daqhub, falls back to ~/.config/daqhub
    pub fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("daqhub"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("daqhub"))
    }

    /// Path of the persisted channel mappings
    pub fn settings_path(dir: &Path) -> PathBuf {
        dir.join("settings.json")
    }

    /// Load `config.json` from `dir`; a missing file gives the defaults
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join("config.json");
        match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)
                .with_context(|| format!("failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }
}
