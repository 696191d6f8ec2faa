//! Handles, subsystems and persistence modes

use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-chosen identifier of a logical I/O channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelHandle(pub u32);

impl ChannelHandle {
    /// Get the raw handle value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One independently started and stopped worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subsystem {
    Discovery,
    AnalogOutput,
    AnalogInput,
    DigitalOutput,
    LaserInput,
    LaserOutput,
}

impl Subsystem {
    pub const ALL: [Subsystem; 6] = [
        Subsystem::Discovery,
        Subsystem::AnalogOutput,
        Subsystem::AnalogInput,
        Subsystem::DigitalOutput,
        Subsystem::LaserInput,
        Subsystem::LaserOutput,
    ];

    /// Subsystems that drive or sample hardware
    pub const IO: [Subsystem; 5] = [
        Subsystem::AnalogOutput,
        Subsystem::AnalogInput,
        Subsystem::DigitalOutput,
        Subsystem::LaserInput,
        Subsystem::LaserOutput,
    ];

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discovery => "Discovery",
            Self::AnalogOutput => "Analog Output",
            Self::AnalogInput => "Analog Input",
            Self::DigitalOutput => "Digital Output",
            Self::LaserInput => "Laser Input",
            Self::LaserOutput => "Laser Output",
        }
    }

    /// Position in [`Subsystem::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Worker thread name
    pub fn thread_name(&self) -> &'static str {
        match self {
            Self::Discovery => "daq-discovery",
            Self::AnalogOutput => "daq-ao",
            Self::AnalogInput => "daq-ai",
            Self::DigitalOutput => "daq-do",
            Self::LaserInput => "daq-laser-ai",
            Self::LaserOutput => "daq-laser-ao",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a mapping change is written to the settings store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persistence {
    #[default]
    Persist,
    /// Used while reloading stored mappings
    Suppress,
}
