//! The six poll loops
//!
//! - [`DiscoveryLoop`]: one scan per start
//! - [`AnalogOutputLoop`]: coalesced setpoint writes (also drives the laser output)
//! - [`AnalogInputLoop`]: sampling and averaging (also samples the laser input)
//! - [`DigitalOutputLoop`]: whole-port word writes with a fail-safe word on stop

mod analog_in;
mod analog_out;
mod digital_out;
mod discovery;

pub use analog_in::{AnalogInputLoop, InputPublisher};
pub use analog_out::AnalogOutputLoop;
pub use digital_out::DigitalOutputLoop;
pub use discovery::DiscoveryLoop;

use std::sync::Arc;
use std::time::Duration;

use daq_sdk::{DaqSdk, HardwareTask, SdkError, VoltageRange};
use tracing::{debug, error, info};

use crate::config::HubConfig;
use crate::events::EventSink;

/// Everything a loop needs to talk to hardware
#[derive(Clone)]
pub struct IoContext {
    pub sdk: Arc<dyn DaqSdk>,
    pub events: EventSink,
    pub io_timeout: Duration,
    pub input_range: VoltageRange,
    pub output_range: VoltageRange,
}

impl IoContext {
    pub fn new(sdk: Arc<dyn DaqSdk>, events: EventSink, config: &HubConfig) -> Self {
        Self {
            sdk,
            events,
            io_timeout: config.io_timeout(),
            input_range: config.input_range,
            output_range: config.output_range,
        }
    }

    /// Create a task with this context's I/O timeout
    pub fn task(&self, name: String) -> Result<HardwareTask, SdkError> {
        Ok(HardwareTask::create(self.sdk.clone(), name)?.with_timeout(self.io_timeout))
    }
}

/// Per-channel failure latch
///
/// The first failure of a channel is logged as an error and published; repeats
/// are logged at debug level until the channel recovers.
struct FaultLatch {
    source: &'static str,
    failing: Vec<bool>,
}

impl FaultLatch {
    fn new(source: &'static str, channels: usize) -> Self {
        Self {
            source,
            failing: vec![false; channels],
        }
    }

    fn fail(&mut self, index: usize, channel: &str, e: &SdkError, events: &EventSink) {
        match self.failing.get_mut(index) {
            Some(failing) if !*failing => {
                *failing = true;
                error!("{}: {}: {}", self.source, channel, e);
                events.error(self.source, format!("{}: {}", channel, e));
            }
            _ => debug!("{}: {} still failing: {}", self.source, channel, e),
        }
    }

    fn ok(&mut self, index: usize, channel: &str) {
        if let Some(failing) = self.failing.get_mut(index) {
            if *failing {
                *failing = false;
                info!("{}: {} recovered", self.source, channel);
            }
        }
    }
}
