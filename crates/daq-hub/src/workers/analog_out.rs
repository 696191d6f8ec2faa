//! Analog output loop

use std::sync::Arc;

use daq_sdk::{HardwareTask, SdkError};
use tracing::debug;

use super::{FaultLatch, IoContext};
use crate::channel::AnalogOutputChannel;
use crate::worker::{PollLoop, Tick};

/// Writes each channel's setpoint when it is dirty
pub struct AnalogOutputLoop {
    io: IoContext,
    source: &'static str,
    channels: Vec<Arc<AnalogOutputChannel>>,
    tasks: Vec<HardwareTask>,
    faults: FaultLatch,
}

impl AnalogOutputLoop {
    /// `source` labels task names, logs and error events
    pub fn new(io: IoContext, source: &'static str, channels: Vec<Arc<AnalogOutputChannel>>) -> Self {
        let faults = FaultLatch::new(source, channels.len());
        Self {
            io,
            source,
            channels,
            tasks: Vec::new(),
            faults,
        }
    }
}

impl PollLoop for AnalogOutputLoop {
    fn setup(&mut self) -> Result<(), SdkError> {
        for channel in &self.channels {
            let mut task = self
                .io
                .task(format!("{} {} {}", self.source, channel.handle(), channel.physical()))?;
            task.add_analog_output(channel.physical(), self.io.output_range)?;
            task.start()?;
            // Current setpoints go out on the first tick
            channel.mark_dirty();
            self.tasks.push(task);
        }
        debug!("{}: {} channel(s) ready", self.source, self.tasks.len());
        Ok(())
    }

    fn tick(&mut self) -> Tick {
        for (index, (channel, task)) in self.channels.iter().zip(&self.tasks).enumerate() {
            match channel.flush(|v| task.write_analog(v)) {
                Ok(true) => {
                    debug!("{}: {} <- {:.4} V", self.source, channel.physical(), channel.voltage());
                    self.faults.ok(index, channel.physical());
                }
                Ok(false) => {}
                Err(e) => self.faults.fail(index, channel.physical(), &e, &self.io.events),
            }
        }
        Tick::Continue
    }

    fn teardown(&mut self) {
        for task in self.tasks.drain(..) {
            task.close();
        }
    }
}
