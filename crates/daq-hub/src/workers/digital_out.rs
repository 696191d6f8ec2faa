//! Digital output loop

use std::sync::Arc;

use daq_sdk::{HardwareTask, SdkError};
use tracing::{debug, error, info};

use super::{FaultLatch, IoContext};
use crate::channel::DigitalPort;
use crate::digital::check_lines;
use crate::worker::{PollLoop, Tick};

const SOURCE: &str = "digital-out";

/// One task per port; writes the whole word when any line changed
pub struct DigitalOutputLoop {
    io: IoContext,
    ports: Vec<Arc<DigitalPort>>,
    tasks: Vec<HardwareTask>,
    faults: FaultLatch,
}

impl DigitalOutputLoop {
    pub fn new(io: IoContext, ports: Vec<Arc<DigitalPort>>) -> Self {
        let faults = FaultLatch::new(SOURCE, ports.len());
        Self {
            io,
            ports,
            tasks: Vec::new(),
            faults,
        }
    }
}

impl PollLoop for DigitalOutputLoop {
    fn setup(&mut self) -> Result<(), SdkError> {
        for port in &self.ports {
            let width = self
                .io
                .sdk
                .digital_port_width(port.physical())
                .check(&format!("query width of {}", port.physical()))?;
            check_lines(port.physical(), width, &port.lines())?;

            let mut task = self.io.task(format!("{} {}", SOURCE, port.physical()))?;
            task.add_digital_output(port.physical())?;
            task.start()?;
            port.mark_dirty();
            self.tasks.push(task);
        }
        Ok(())
    }

    fn tick(&mut self) -> Tick {
        for (index, (port, task)) in self.ports.iter().zip(&self.tasks).enumerate() {
            match port.flush(|word| task.write_digital(word)) {
                Ok(true) => {
                    debug!("{}: {} <- {:#b}", SOURCE, port.physical(), port.word());
                    self.faults.ok(index, port.physical());
                }
                Ok(false) => {}
                Err(e) => self.faults.fail(index, port.physical(), &e, &self.io.events),
            }
        }
        Tick::Continue
    }

    /// Drive every line to its disabled level, then release the tasks
    fn teardown(&mut self) {
        for (port, task) in self.ports.iter().zip(self.tasks.drain(..)) {
            let word = port.fail_safe_word();
            match task.write_digital(word) {
                Ok(()) => info!("{}: {} fail-safe word {:#b}", SOURCE, port.physical(), word),
                Err(e) => error!(
                    "{}: failed to write fail-safe word to {}: {}",
                    SOURCE,
                    port.physical(),
                    e
                ),
            }
            task.close();
        }
    }
}
