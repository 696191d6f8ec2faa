//! Discovery loop

use std::sync::mpsc::Sender;

use daq_detect::DeviceScanner;
use daq_sdk::SdkError;
use tracing::warn;

use crate::events::WorkerMessage;
use crate::worker::{PollLoop, Tick};

/// Scans once, posts the result to the coordinator and finishes
pub struct DiscoveryLoop {
    scanner: DeviceScanner,
    tx: Sender<WorkerMessage>,
}

impl DiscoveryLoop {
    pub fn new(scanner: DeviceScanner, tx: Sender<WorkerMessage>) -> Self {
        Self { scanner, tx }
    }
}

impl PollLoop for DiscoveryLoop {
    fn setup(&mut self) -> Result<(), SdkError> {
        Ok(())
    }

    fn tick(&mut self) -> Tick {
        let result = self.scanner.scan();
        if self.tx.send(WorkerMessage::DiscoveryFinished(result)).is_err() {
            warn!("Discovery finished after the coordinator went away");
        }
        Tick::Finished
    }
}
