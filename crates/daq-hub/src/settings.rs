//! Persisted settings
//!
//! Channel mappings and configuration are stored as strings under fixed
//! keys. The store is read once at startup and written on every mutating
//! coordinator call unless persistence is suppressed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::HubError;

/// Setting keys
pub mod keys {
    pub const SAMPLE_COUNT: &str = "AnalogIn/SampleCount";
    pub const MIN_VOLTAGE: &str = "AnalogOut/MinVoltage";
    pub const MAX_VOLTAGE: &str = "AnalogOut/MaxVoltage";
    pub const AUTO_DISCOVER: &str = "Hardware/AutoDiscover";

    pub fn analog_input(slot: u32) -> String {
        format!("AnalogIn/Channel{slot}")
    }

    pub fn analog_output(slot: u32) -> String {
        format!("AnalogOut/Channel{slot}")
    }

    pub fn digital_output(slot: u32) -> String {
        format!("DigitalOut/Channel{slot}")
    }

    pub fn digital_inverted(slot: u32) -> String {
        format!("DigitalOut/Inverted{slot}")
    }
}

/// String-keyed settings persistence
pub trait SettingsStore: Send {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), HubError>;
}

/// Read and parse a setting; unparsable values are logged and ignored
pub fn get_parsed<T: FromStr>(store: &dyn SettingsStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparsable setting {} = {:?}", key, raw);
            None
        }
    }
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), HubError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Write-through JSON file store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open `path`; a missing file starts an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HubError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).map_err(|e| {
                HubError::Settings(format!("failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                return Err(HubError::Settings(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), HubError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HubError::Settings(format!("failed to create settings directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.values)
            .map_err(|e| HubError::Settings(format!("failed to serialize settings: {}", e)))?;

        std::fs::write(&self.path, json)
            .map_err(|e| HubError::Settings(format!("failed to write settings: {}", e)))
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), HubError> {
        if self.values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}
