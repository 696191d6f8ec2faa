//! RAII hardware task wrapper
//!
//! A [`HardwareTask`] owns one vendor task. Dropping it (or calling
//! [`HardwareTask::close`]) always issues stop followed by clear, so a setup
//! sequence that bails out with `?` halfway through releases everything it
//! created without any explicit unwinding code.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SdkError;
use crate::sdk::{DaqSdk, TaskId, VoltageRange};
use crate::status::Reply;

/// Timeout applied to scalar reads and writes unless overridden
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(1);

/// One vendor task, stopped and cleared on drop
pub struct HardwareTask {
    sdk: Arc<dyn DaqSdk>,
    id: TaskId,
    name: String,
    timeout: Duration,
    running: bool,
    closed: bool,
}

impl HardwareTask {
    /// Create a new, empty task
    pub fn create(sdk: Arc<dyn DaqSdk>, name: impl Into<String>) -> Result<Self, SdkError> {
        let name = name.into();
        let id = sdk
            .create_task(&name)
            .check(&format!("create task '{name}'"))?;
        debug!("Created {} '{}'", id, name);

        Ok(Self {
            sdk,
            id,
            name,
            timeout: DEFAULT_IO_TIMEOUT,
            running: false,
            closed: false,
        })
    }

    /// Override the read/write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn add_analog_output(&self, physical: &str, range: VoltageRange) -> Result<(), SdkError> {
        let reply = self
            .sdk
            .create_analog_output_channel(self.id, physical, range);
        self.checked(reply, "create analog output channel")
    }

    pub fn add_analog_input(&self, physical: &str, range: VoltageRange) -> Result<(), SdkError> {
        let reply = self.sdk.create_analog_input_channel(self.id, physical, range);
        self.checked(reply, "create analog input channel")
    }

    pub fn add_digital_output(&self, port: &str) -> Result<(), SdkError> {
        let reply = self.sdk.create_digital_output_channel(self.id, port);
        self.checked(reply, "create digital output channel")
    }

    pub fn start(&mut self) -> Result<(), SdkError> {
        let reply = self.sdk.start_task(self.id);
        self.checked(reply, "start task")?;
        self.running = true;
        Ok(())
    }

    pub fn write_analog(&self, value: f64) -> Result<(), SdkError> {
        let reply = self.sdk.write_analog_scalar(self.id, value, self.timeout);
        self.checked(reply, "write analog value")
    }

    pub fn read_analog(&self) -> Result<f64, SdkError> {
        let reply = self.sdk.read_analog_scalar(self.id, self.timeout);
        self.checked(reply, "read analog value")
    }

    pub fn write_digital(&self, word: u32) -> Result<(), SdkError> {
        let reply = self.sdk.write_digital_port(self.id, word, self.timeout);
        self.checked(reply, "write digital word")
    }

    /// Stop and clear the task now
    pub fn close(mut self) {
        self.release();
    }

    fn checked<T>(&self, reply: Reply<T>, operation: &str) -> Result<T, SdkError> {
        if reply.code.is_success() {
            return Ok(reply.value);
        }
        reply.check(&format!("{} on '{}'", operation, self.name))
    }

    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.running = false;

        if let Err(e) = self.sdk.stop_task(self.id).check("stop task") {
            warn!("Failed to stop '{}': {}", self.name, e);
        }
        if let Err(e) = self.sdk.clear_task(self.id).check("clear task") {
            warn!("Failed to clear '{}': {}", self.name, e);
        }
        debug!("Released {} '{}'", self.id, self.name);
    }
}

impl Drop for HardwareTask {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for HardwareTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardwareTask")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("running", &self.running)
            .finish()
    }
}
