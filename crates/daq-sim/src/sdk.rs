//! In-memory SDK implementation
//!
//! Tracks tasks and their channels, validates physical names against the
//! configured devices, serves queued analog input samples and records every
//! analog and digital write for test verification.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use daq_sdk::diagnostics::codes;
use daq_sdk::{
    device_of, ChannelKind, DaqSdk, Reply, SdkVersion, StatusCode, TaskId, VoltageRange,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::device::SimDevice;
use crate::fault::{SimFault, SimOp};

const NO_CHANNELS: i32 = -200_230;
const NO_OUTPUT_CHANNELS: i32 = -200_524;
const INVALID_RANGE: i32 = -200_431;
const WORD_TOO_WIDE: i32 = -200_802;

/// A recorded analog write
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogWrite {
    pub physical: String,
    pub value: f64,
}

/// A recorded digital port write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalWrite {
    pub port: String,
    pub word: u32,
}

#[derive(Debug, Clone)]
enum SimChannel {
    AnalogOutput(String),
    AnalogInput(String),
    DigitalOutput(String),
}

impl SimChannel {
    fn physical(&self) -> &str {
        match self {
            SimChannel::AnalogOutput(p) | SimChannel::AnalogInput(p) | SimChannel::DigitalOutput(p) => p,
        }
    }
}

#[derive(Debug)]
struct SimTask {
    name: String,
    channels: Vec<SimChannel>,
    running: bool,
}

#[derive(Debug, Default)]
struct SimState {
    devices: Vec<SimDevice>,
    next_task: u64,
    tasks: HashMap<TaskId, SimTask>,
    created_tasks: usize,
    faults: Vec<SimFault>,
    analog_writes: Vec<AnalogWrite>,
    digital_writes: Vec<DigitalWrite>,
    samples: HashMap<String, VecDeque<f64>>,
    resting: HashMap<String, f64>,
    width_overrides: HashMap<String, u32>,
}

impl SimState {
    /// Ok(status to report on success) or Err(error code)
    fn gate(&self, op: SimOp, names: &[&str]) -> Result<StatusCode, i32> {
        match self
            .faults
            .iter()
            .find(|f| f.matches(op, names.iter().copied()))
        {
            Some(fault) if fault.code < 0 => Err(fault.code),
            Some(fault) => Ok(StatusCode(fault.code)),
            None => Ok(StatusCode::SUCCESS),
        }
    }

    fn gate_task(&self, op: SimOp, id: TaskId) -> Result<StatusCode, i32> {
        let task = self.tasks.get(&id).ok_or(codes::INVALID_TASK)?;
        let mut names: Vec<&str> = task.channels.iter().map(SimChannel::physical).collect();
        names.push(&task.name);
        self.gate(op, &names)
    }

    /// First channel of a running task, after fault gating
    fn running_channel(&self, op: SimOp, id: TaskId) -> Result<(SimChannel, StatusCode), i32> {
        let status = self.gate_task(op, id)?;
        let task = self.tasks.get(&id).ok_or(codes::INVALID_TASK)?;
        if !task.running {
            return Err(codes::TASK_NOT_RUNNING);
        }
        let channel = task.channels.first().cloned().ok_or(NO_CHANNELS)?;
        Ok((channel, status))
    }

    fn device(&self, name: &str) -> Option<&SimDevice> {
        self.devices.iter().find(|d| d.name == name)
    }

    fn port_width(&self, port: &str) -> Option<u32> {
        if let Some(width) = self.width_overrides.get(port) {
            return Some(*width);
        }
        self.device(device_of(port))?.port_width(port)
    }

    fn add_channel(&mut self, id: TaskId, channel: SimChannel) -> Result<StatusCode, i32> {
        let status = self.gate(SimOp::CreateChannel, &[channel.physical()])?;

        let known = match &channel {
            SimChannel::AnalogOutput(p) => self
                .device(device_of(p))
                .is_some_and(|d| d.has_channel(ChannelKind::AnalogOutput, p)),
            SimChannel::AnalogInput(p) => self
                .device(device_of(p))
                .is_some_and(|d| d.has_channel(ChannelKind::AnalogInput, p)),
            SimChannel::DigitalOutput(p) => self.port_width(p).is_some(),
        };
        if !known {
            return Err(codes::PHYSICAL_CHANNEL_MISSING);
        }

        let task = self.tasks.get_mut(&id).ok_or(codes::INVALID_TASK)?;
        debug!("sim: {} += {:?}", task.name, channel);
        task.channels.push(channel);
        Ok(status)
    }
}

fn reply<T: Default>(result: Result<(StatusCode, T), i32>) -> Reply<T> {
    match result {
        Ok((code, value)) => Reply::with_code(code, value),
        Err(code) => Reply::failed(code),
    }
}

/// In-memory [`DaqSdk`]
#[derive(Debug)]
pub struct SimulatedSdk {
    version: SdkVersion,
    state: Mutex<SimState>,
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSdk {
    /// A simulator with a single USB-6001 named `Dev1`
    pub fn new() -> Self {
        Self::with_devices(vec![SimDevice::usb_6001("Dev1")])
    }

    pub fn with_devices(devices: Vec<SimDevice>) -> Self {
        Self {
            version: SdkVersion {
                major: 21,
                minor: 8,
                update: 0,
            },
            state: Mutex::new(SimState {
                devices,
                next_task: 1,
                ..Default::default()
            }),
        }
    }

    /// Replace the attached devices (takes effect on the next scan)
    pub fn set_devices(&self, devices: Vec<SimDevice>) {
        self.state.lock().devices = devices;
    }

    pub fn inject(&self, fault: SimFault) {
        self.state.lock().faults.push(fault);
    }

    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Queue samples returned by successive reads of `physical`
    pub fn push_samples(&self, physical: &str, samples: &[f64]) {
        self.state
            .lock()
            .samples
            .entry(physical.to_string())
            .or_default()
            .extend(samples.iter().copied());
    }

    /// Value returned once the sample queue of `physical` is empty
    pub fn set_resting_value(&self, physical: &str, value: f64) {
        self.state
            .lock()
            .resting
            .insert(physical.to_string(), value);
    }

    /// Override the reported width of a port
    pub fn set_port_width(&self, port: &str, width: u32) {
        self.state
            .lock()
            .width_overrides
            .insert(port.to_string(), width);
    }

    /// Values written to `physical`, oldest first
    pub fn analog_writes(&self, physical: &str) -> Vec<f64> {
        self.state
            .lock()
            .analog_writes
            .iter()
            .filter(|w| w.physical == physical)
            .map(|w| w.value)
            .collect()
    }

    /// Words written to `port`, oldest first
    pub fn digital_writes(&self, port: &str) -> Vec<u32> {
        self.state
            .lock()
            .digital_writes
            .iter()
            .filter(|w| w.port == port)
            .map(|w| w.word)
            .collect()
    }

    pub fn clear_writes(&self) {
        let mut state = self.state.lock();
        state.analog_writes.clear();
        state.digital_writes.clear();
    }

    /// Tasks created and not yet cleared
    pub fn live_tasks(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Names of live tasks, sorted
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .tasks
            .values()
            .map(|t| t.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Total tasks ever created
    pub fn created_tasks(&self) -> usize {
        self.state.lock().created_tasks
    }
}

impl DaqSdk for SimulatedSdk {
    fn version(&self) -> Reply<SdkVersion> {
        let state = self.state.lock();
        reply(state.gate(SimOp::Version, &[]).map(|s| (s, self.version)))
    }

    fn device_names(&self) -> Reply<String> {
        let state = self.state.lock();
        reply(state.gate(SimOp::DeviceNames, &[]).map(|s| {
            let names: Vec<&str> = state.devices.iter().map(|d| d.name.as_str()).collect();
            (s, names.join(", "))
        }))
    }

    fn product_type(&self, device: &str) -> Reply<String> {
        let state = self.state.lock();
        reply(state.gate(SimOp::ProductType, &[device]).and_then(|s| {
            let dev = state.device(device).ok_or(codes::INVALID_DEVICE_ID)?;
            Ok((s, dev.product_type.clone()))
        }))
    }

    fn serial_number(&self, device: &str) -> Reply<u32> {
        let state = self.state.lock();
        reply(state.gate(SimOp::SerialNumber, &[device]).and_then(|s| {
            let dev = state.device(device).ok_or(codes::INVALID_DEVICE_ID)?;
            Ok((s, dev.serial_number))
        }))
    }

    fn is_simulated(&self, device: &str) -> Reply<bool> {
        let state = self.state.lock();
        reply(state.gate(SimOp::IsSimulated, &[device]).and_then(|s| {
            state.device(device).ok_or(codes::INVALID_DEVICE_ID)?;
            Ok((s, true))
        }))
    }

    fn physical_channels(&self, device: &str, kind: ChannelKind) -> Reply<String> {
        let state = self.state.lock();
        reply(state.gate(SimOp::PhysicalChannels, &[device]).and_then(|s| {
            let dev = state.device(device).ok_or(codes::INVALID_DEVICE_ID)?;
            Ok((s, dev.channels(kind).join(", ")))
        }))
    }

    fn create_task(&self, name: &str) -> Reply<TaskId> {
        let mut state = self.state.lock();
        let status = match state.gate(SimOp::CreateTask, &[name]) {
            Ok(s) => s,
            Err(code) => return Reply::failed(code),
        };

        let id = TaskId(state.next_task);
        state.next_task += 1;
        state.created_tasks += 1;
        state.tasks.insert(
            id,
            SimTask {
                name: name.to_string(),
                channels: Vec::new(),
                running: false,
            },
        );
        debug!("sim: created {} '{}'", id, name);
        Reply::with_code(status, id)
    }

    fn start_task(&self, task: TaskId) -> Reply<()> {
        let mut state = self.state.lock();
        let result = state.gate_task(SimOp::StartTask, task).and_then(|s| {
            let entry = state.tasks.get_mut(&task).ok_or(codes::INVALID_TASK)?;
            if entry.channels.is_empty() {
                return Err(NO_CHANNELS);
            }
            entry.running = true;
            Ok((s, ()))
        });
        reply(result)
    }

    fn stop_task(&self, task: TaskId) -> Reply<()> {
        let mut state = self.state.lock();
        let result = state.gate_task(SimOp::StopTask, task).and_then(|s| {
            let entry = state.tasks.get_mut(&task).ok_or(codes::INVALID_TASK)?;
            entry.running = false;
            Ok((s, ()))
        });
        reply(result)
    }

    fn clear_task(&self, task: TaskId) -> Reply<()> {
        let mut state = self.state.lock();
        let result = state.gate_task(SimOp::ClearTask, task).and_then(|s| {
            let entry = state.tasks.remove(&task).ok_or(codes::INVALID_TASK)?;
            debug!("sim: cleared {} '{}'", task, entry.name);
            Ok((s, ()))
        });
        reply(result)
    }

    fn create_analog_output_channel(
        &self,
        task: TaskId,
        physical: &str,
        range: VoltageRange,
    ) -> Reply<()> {
        if range.min > range.max {
            return Reply::failed(INVALID_RANGE);
        }
        let mut state = self.state.lock();
        reply(
            state
                .add_channel(task, SimChannel::AnalogOutput(physical.to_string()))
                .map(|s| (s, ())),
        )
    }

    fn create_analog_input_channel(
        &self,
        task: TaskId,
        physical: &str,
        range: VoltageRange,
    ) -> Reply<()> {
        if range.min > range.max {
            return Reply::failed(INVALID_RANGE);
        }
        let mut state = self.state.lock();
        reply(
            state
                .add_channel(task, SimChannel::AnalogInput(physical.to_string()))
                .map(|s| (s, ())),
        )
    }

    fn create_digital_output_channel(&self, task: TaskId, port: &str) -> Reply<()> {
        let mut state = self.state.lock();
        reply(
            state
                .add_channel(task, SimChannel::DigitalOutput(port.to_string()))
                .map(|s| (s, ())),
        )
    }

    fn write_analog_scalar(&self, task: TaskId, value: f64, _timeout: Duration) -> Reply<()> {
        let mut state = self.state.lock();
        let (channel, status) = match state.running_channel(SimOp::WriteAnalog, task) {
            Ok(found) => found,
            Err(code) => return Reply::failed(code),
        };
        let SimChannel::AnalogOutput(physical) = channel else {
            return Reply::failed(NO_OUTPUT_CHANNELS);
        };

        let limit = state
            .device(device_of(&physical))
            .map(|d| d.output_limit)
            .unwrap_or(10.0);
        if !value.is_finite() || value.abs() > limit {
            return Reply::failed(codes::OUTPUT_OUT_OF_RANGE);
        }

        debug!("sim: {} <- {:.4} V", physical, value);
        state.analog_writes.push(AnalogWrite { physical, value });
        Reply::with_code(status, ())
    }

    fn read_analog_scalar(&self, task: TaskId, _timeout: Duration) -> Reply<f64> {
        let mut state = self.state.lock();
        let (channel, status) = match state.running_channel(SimOp::ReadAnalog, task) {
            Ok(found) => found,
            Err(code) => return Reply::failed(code),
        };
        let SimChannel::AnalogInput(physical) = channel else {
            return Reply::failed(NO_CHANNELS);
        };

        let queued = state
            .samples
            .get_mut(&physical)
            .and_then(VecDeque::pop_front);
        let value = queued
            .or_else(|| state.resting.get(&physical).copied())
            .unwrap_or(0.0);
        Reply::with_code(status, value)
    }

    fn write_digital_port(&self, task: TaskId, word: u32, _timeout: Duration) -> Reply<()> {
        let mut state = self.state.lock();
        let (channel, status) = match state.running_channel(SimOp::WriteDigital, task) {
            Ok(found) => found,
            Err(code) => return Reply::failed(code),
        };
        let SimChannel::DigitalOutput(port) = channel else {
            return Reply::failed(NO_OUTPUT_CHANNELS);
        };

        let width = state.port_width(&port).unwrap_or(0);
        if width < 32 && (word >> width) != 0 {
            return Reply::failed(WORD_TOO_WIDE);
        }

        debug!("sim: {} <- {:#010b}", port, word);
        state.digital_writes.push(DigitalWrite { port, word });
        Reply::with_code(status, ())
    }

    fn digital_port_width(&self, port: &str) -> Reply<u32> {
        let state = self.state.lock();
        reply(state.gate(SimOp::PortWidth, &[port]).and_then(|s| {
            let width = state.port_width(port).ok_or(codes::PHYSICAL_CHANNEL_MISSING)?;
            Ok((s, width))
        }))
    }
}
