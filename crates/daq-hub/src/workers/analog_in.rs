//! Analog input loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use daq_sdk::{HardwareTask, SdkError};

use super::{FaultLatch, IoContext};
use crate::channel::AnalogInputChannel;
use crate::events::IoEvent;
use crate::worker::{PollLoop, Tick};

/// Which event a sampled value is published as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPublisher {
    /// `IoEvent::AnalogInputValue` for each mapped channel
    Channels,
    /// `IoEvent::LaserInputValue`
    Laser,
}

/// Samples each channel once per tick and publishes raw value or mean
pub struct AnalogInputLoop {
    io: IoContext,
    source: &'static str,
    publisher: InputPublisher,
    channels: Vec<Arc<AnalogInputChannel>>,
    use_average: Arc<AtomicBool>,
    tasks: Vec<HardwareTask>,
    faults: FaultLatch,
}

impl AnalogInputLoop {
    pub fn new(
        io: IoContext,
        source: &'static str,
        publisher: InputPublisher,
        channels: Vec<Arc<AnalogInputChannel>>,
        use_average: Arc<AtomicBool>,
    ) -> Self {
        let faults = FaultLatch::new(source, channels.len());
        Self {
            io,
            source,
            publisher,
            channels,
            use_average,
            tasks: Vec::new(),
            faults,
        }
    }

    fn publish(&self, channel: &AnalogInputChannel, value: f64, averaged: bool) {
        let event = match self.publisher {
            InputPublisher::Channels => IoEvent::AnalogInputValue {
                handle: channel.handle(),
                value,
                averaged,
            },
            InputPublisher::Laser => IoEvent::LaserInputValue { value, averaged },
        };
        self.io.events.emit(event);
    }
}

impl PollLoop for AnalogInputLoop {
    fn setup(&mut self) -> Result<(), SdkError> {
        for channel in &self.channels {
            let mut task = self
                .io
                .task(format!("{} {} {}", self.source, channel.handle(), channel.physical()))?;
            task.add_analog_input(channel.physical(), self.io.input_range)?;
            task.start()?;
            self.tasks.push(task);
        }
        Ok(())
    }

    fn tick(&mut self) -> Tick {
        for index in 0..self.tasks.len() {
            let channel = &self.channels[index];
            match self.tasks[index].read_analog() {
                Ok(sample) => {
                    let (raw, mean) = channel.record(sample);
                    let averaged = self.use_average.load(Ordering::Relaxed);
                    self.publish(channel, if averaged { mean } else { raw }, averaged);
                    self.faults.ok(index, channel.physical());
                }
                Err(e) => self
                    .faults
                    .fail(index, channel.physical(), &e, &self.io.events),
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
