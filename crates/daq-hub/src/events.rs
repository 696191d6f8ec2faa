//! Coordinator events and worker messages
//!
//! Two channels leave the workers:
//!
//! - [`WorkerMessage`] over `std::sync::mpsc` to the coordinator, applied on
//!   the coordinator's thread by [`crate::IoCoordinator::process_messages`]
//! - [`IoEvent`] over a `tokio::sync::broadcast` channel to any number of
//!   subscribers, raised on whichever thread produced the event

use daq_detect::{DetectError, Device};
use tokio::sync::broadcast;

use crate::state::{ChannelHandle, Subsystem};

/// Events published to subscribers
#[derive(Debug, Clone)]
pub enum IoEvent {
    // -------------------------------------------------------------------------
    // Discovery
    // -------------------------------------------------------------------------
    /// A device scan has started
    DiscoveryStarted,

    /// A scan completed and stored mappings were reloaded
    DevicesUpdated {
        /// Devices found by the scan
        devices: Vec<Device>,
    },

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------
    /// A subsystem was enabled or disabled
    SubsystemChanged { subsystem: Subsystem, enabled: bool },

    // -------------------------------------------------------------------------
    // Values
    // -------------------------------------------------------------------------
    /// A sampled analog input value
    AnalogInputValue {
        handle: ChannelHandle,
        value: f64,
        /// `value` is the running mean rather than the raw sample
        averaged: bool,
    },

    /// A sampled laser input value
    LaserInputValue { value: f64, averaged: bool },

    /// A digital line's logical state changed
    DigitalOutputChanged { handle: ChannelHandle, enabled: bool },

    /// An error occurred in the coordinator or a worker
    Error {
        /// Source of the error
        source: String,
        /// Error message
        message: String,
    },
}

impl IoEvent {
    /// Check if this is a start/stop or discovery event
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            IoEvent::DiscoveryStarted
                | IoEvent::DevicesUpdated { .. }
                | IoEvent::SubsystemChanged { .. }
        )
    }

    /// Check if this is a streamed input value
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            IoEvent::AnalogInputValue { .. } | IoEvent::LaserInputValue { .. }
        )
    }

    /// Get the channel handle if this event concerns a mapped channel
    pub fn handle(&self) -> Option<ChannelHandle> {
        match self {
            IoEvent::AnalogInputValue { handle, .. }
            | IoEvent::DigitalOutputChanged { handle, .. } => Some(*handle),
            _ => None,
        }
    }
}

/// Messages from workers to the coordinator
#[derive(Debug)]
pub enum WorkerMessage {
    /// A scan finished
    DiscoveryFinished(Result<Vec<Device>, DetectError>),
}

/// Operating system power notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    /// The machine is about to sleep
    SuspendImminent,
}

/// Cloneable publisher for [`IoEvent`]s
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<IoEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event; having no subscribers is not an error
    pub fn emit(&self, event: IoEvent) {
        let _ = self.tx.send(event);
    }

    pub fn error(&self, source: impl Into<String>, message: impl Into<String>) {
        self.emit(IoEvent::Error {
            source: source.into(),
            message: message.into(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IoEvent> {
        self.tx.subscribe()
    }
}
