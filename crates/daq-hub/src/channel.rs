//! Channel records shared between the coordinator and its workers
//!
//! Each record embeds its own lock. The coordinator writes setpoints and
//! mappings, the owning worker writes hardware-side state (dirty-flag clears,
//! sampled values); nothing else touches them.

use parking_lot::Mutex;

use crate::averaging::AveragingBuffer;
use crate::digital::{fail_safe_word, port_word, DigitalLine};
use crate::limits::VoltageLimits;
use crate::state::ChannelHandle;

#[derive(Debug)]
struct OutputState {
    voltage: f64,
    dirty: bool,
}

/// An analog output channel with a coalesced setpoint
#[derive(Debug)]
pub struct AnalogOutputChannel {
    handle: ChannelHandle,
    physical: String,
    state: Mutex<OutputState>,
}

impl AnalogOutputChannel {
    pub fn new(handle: ChannelHandle, physical: impl Into<String>, voltage: f64) -> Self {
        Self {
            handle,
            physical: physical.into(),
            state: Mutex::new(OutputState {
                voltage,
                dirty: false,
            }),
        }
    }

    pub fn handle(&self) -> ChannelHandle {
        self.handle
    }

    pub fn physical(&self) -> &str {
        &self.physical
    }

    /// Current setpoint
    pub fn voltage(&self) -> f64 {
        self.state.lock().voltage
    }

    /// Store an already clamped setpoint and mark it for writing
    pub fn set_voltage(&self, voltage: f64) {
        let mut state = self.state.lock();
        state.voltage = voltage;
        state.dirty = true;
    }

    /// Pull the setpoint back inside `limits`; returns the new value
    pub fn reclamp(&self, limits: &VoltageLimits) -> f64 {
        let mut state = self.state.lock();
        let clamped = limits.clamp(state.voltage);
        if clamped != state.voltage {
            state.voltage = clamped;
            state.dirty = true;
        }
        clamped
    }

    pub fn mark_dirty(&self) {
        self.state.lock().dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Write the pending setpoint, if any, and clear the dirty flag
    ///
    /// The lock is held across `write`. On failure the flag stays set so the
    /// next tick retries. Returns whether a write happened.
    pub fn flush<E>(&self, write: impl FnOnce(f64) -> Result<(), E>) -> Result<bool, E> {
        let mut state = self.state.lock();
        if !state.dirty {
            return Ok(false);
        }
        write(state.voltage)?;
        state.dirty = false;
        Ok(true)
    }
}

#[derive(Debug)]
struct InputState {
    buffer: AveragingBuffer,
    last_value: f64,
    last_mean: f64,
}

/// An analog input channel with its running average
#[derive(Debug)]
pub struct AnalogInputChannel {
    handle: ChannelHandle,
    physical: String,
    state: Mutex<InputState>,
}

impl AnalogInputChannel {
    pub fn new(handle: ChannelHandle, physical: impl Into<String>, sample_count: usize) -> Self {
        Self {
            handle,
            physical: physical.into(),
            state: Mutex::new(InputState {
                buffer: AveragingBuffer::new(sample_count),
                last_value: 0.0,
                last_mean: 0.0,
            }),
        }
    }

    pub fn handle(&self) -> ChannelHandle {
        self.handle
    }

    pub fn physical(&self) -> &str {
        &self.physical
    }

    /// Store a new sample; returns (raw, mean)
    pub fn record(&self, sample: f64) -> (f64, f64) {
        let mut state = self.state.lock();
        let mean = state.buffer.push(sample);
        state.last_value = sample;
        state.last_mean = mean;
        (sample, mean)
    }

    /// Last raw sample
    pub fn value(&self) -> f64 {
        self.state.lock().last_value
    }

    /// Last running mean
    pub fn average(&self) -> f64 {
        self.state.lock().last_mean
    }

    /// Resize the averaging window, discarding collected samples
    pub fn reset(&self, sample_count: usize) {
        let mut state = self.state.lock();
        state.buffer.reset(sample_count);
        state.last_mean = state.last_value;
    }

    pub fn sample_count(&self) -> usize {
        self.state.lock().buffer.capacity()
    }
}

#[derive(Debug)]
struct PortState {
    lines: Vec<DigitalLine>,
    word: u32,
    dirty: bool,
}

impl PortState {
    fn repack(&mut self) {
        self.word = port_word(&self.lines);
        self.dirty = true;
    }
}

/// A digital port and every logical line mapped onto it
#[derive(Debug)]
pub struct DigitalPort {
    physical: String,
    state: Mutex<PortState>,
}

impl DigitalPort {
    pub fn new(physical: impl Into<String>) -> Self {
        Self {
            physical: physical.into(),
            state: Mutex::new(PortState {
                lines: Vec::new(),
                word: 0,
                dirty: false,
            }),
        }
    }

    /// Port identifier (`Dev1/port0`)
    pub fn physical(&self) -> &str {
        &self.physical
    }

    /// Snapshot of the lines, in mapping order
    pub fn lines(&self) -> Vec<DigitalLine> {
        self.state.lock().lines.clone()
    }

    pub fn line(&self, handle: ChannelHandle) -> Option<DigitalLine> {
        self.state
            .lock()
            .lines
            .iter()
            .find(|l| l.handle == handle)
            .copied()
    }

    pub fn contains(&self, handle: ChannelHandle) -> bool {
        self.line(handle).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().lines.is_empty()
    }

    /// Add a line, replacing any line with the same handle
    pub fn insert(&self, line: DigitalLine) {
        let mut state = self.state.lock();
        match state.lines.iter().position(|l| l.handle == line.handle) {
            Some(index) => state.lines[index] = line,
            None => state.lines.push(line),
        }
        state.repack();
    }

    /// Remove a line; returns it if it was present
    pub fn remove(&self, handle: ChannelHandle) -> Option<DigitalLine> {
        let mut state = self.state.lock();
        let index = state.lines.iter().position(|l| l.handle == handle)?;
        let line = state.lines.remove(index);
        state.repack();
        Some(line)
    }

    /// Set a line's logical state and recompute the whole word
    ///
    /// Returns the new word, or `None` if the handle is not on this port.
    pub fn set_enabled(&self, handle: ChannelHandle, enabled: bool) -> Option<u32> {
        let mut state = self.state.lock();
        let line = state.lines.iter_mut().find(|l| l.handle == handle)?;
        line.enabled = enabled;
        state.repack();
        Some(state.word)
    }

    /// Word currently held for the port
    pub fn word(&self) -> u32 {
        self.state.lock().word
    }

    pub fn fail_safe_word(&self) -> u32 {
        fail_safe_word(&self.state.lock().lines)
    }

    pub fn mark_dirty(&self) {
        self.state.lock().dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Write the whole word if dirty, then clear the flag
    pub fn flush<E>(&self, write: impl FnOnce(u32) -> Result<(), E>) -> Result<bool, E> {
        let mut state = self.state.lock();
        if !state.dirty {
            return Ok(false);
        }
        write(state.word)?;
        state.dirty = false;
        Ok(true)
    }
}
