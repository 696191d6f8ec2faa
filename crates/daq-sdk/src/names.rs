//! Physical channel and line names
//!
//! Vendor SDKs return channel lists as a single delimited string
//! (`"Dev1/ai0, Dev1/ai1"`) and name digital lines as
//! `<device>/<port>/line<N>`.

use crate::error::SdkError;

/// Split a vendor channel list into trimmed, non-empty names
pub fn split_channel_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Device component of a physical name (`"Dev1/ai0"` -> `"Dev1"`)
pub fn device_of(physical: &str) -> &str {
    physical
        .split_once('/')
        .map(|(device, _)| device)
        .unwrap_or(physical)
}

/// A parsed digital line name such as `Dev1/port0/line3`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DigitalLineName {
    /// Physical port identifier (`Dev1/port0`)
    pub port: String,
    /// Bit index within the port
    pub line: u32,
}

impl DigitalLineName {
    /// Parse `<port>/line<N>`
    pub fn parse(name: &str) -> Result<Self, SdkError> {
        let name = name.trim();
        let (port, line) = name
            .rsplit_once('/')
            .ok_or_else(|| SdkError::Configuration(format!("'{name}' is not a digital line name")))?;

        if port.is_empty() {
            return Err(SdkError::Configuration(format!(
                "'{name}' has no port component"
            )));
        }

        let index = line
            .strip_prefix("line")
            .ok_or_else(|| SdkError::Configuration(format!("'{name}' has no line component")))?;
        let line = index.parse::<u32>().map_err(|_| {
            SdkError::Configuration(format!("'{name}' has an unparsable line index '{index}'"))
        })?;

        Ok(Self {
            port: port.to_string(),
            line,
        })
    }
}

impl std::fmt::Display for DigitalLineName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/line{}", self.port, self.line)
    }
}
