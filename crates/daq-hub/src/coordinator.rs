//! The I/O coordinator
//!
//! [`IoCoordinator`] owns every channel map and every worker. It is the only
//! writer of mappings and setpoints; workers own the hardware side.
//!
//! # Mapping changes
//!
//! A worker never sees a half-edited channel list. Every mapping call stops
//! the affected worker if it is running, edits the list, persists the change
//! (unless suppressed) and restarts the worker only if it was running and
//! still has something to drive.
//!
//! # Threading
//!
//! The coordinator lives on one thread. Workers report back through a typed
//! channel drained by [`IoCoordinator::process_messages`], which the owning
//! application calls from that same thread.

use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use daq_detect::{DetectError, Device, DeviceScanner};
use daq_sdk::{DaqSdk, DigitalLineName};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::channel::{AnalogInputChannel, AnalogOutputChannel, DigitalPort};
use crate::config::HubConfig;
use crate::digital::DigitalLine;
use crate::error::HubError;
use crate::events::{EventSink, IoEvent, PowerEvent, WorkerMessage};
use crate::limits::VoltageLimits;
use crate::settings::{get_parsed, keys, SettingsStore};
use crate::state::{ChannelHandle, Persistence, Subsystem};
use crate::worker::{Worker, WorkerTiming};
use crate::workers::{
    AnalogInputLoop, AnalogOutputLoop, DigitalOutputLoop, DiscoveryLoop, InputPublisher,
    IoContext,
};

/// Handle carried by the laser channels, which live outside the handle maps
pub const LASER_HANDLE: ChannelHandle = ChannelHandle(u32::MAX);

/// Hardware I/O coordinator
pub struct IoCoordinator {
    sdk: Arc<dyn DaqSdk>,
    settings: Box<dyn SettingsStore>,
    config: HubConfig,
    limits: VoltageLimits,
    sample_count: usize,
    auto_discover: bool,
    use_average: Arc<AtomicBool>,
    devices: Vec<Device>,
    outputs: Vec<Arc<AnalogOutputChannel>>,
    inputs: Vec<Arc<AnalogInputChannel>>,
    ports: Vec<Arc<DigitalPort>>,
    laser_output: Arc<AnalogOutputChannel>,
    laser_input: Arc<AnalogInputChannel>,
    workers: [Worker; 6],
    events: EventSink,
    message_tx: Sender<WorkerMessage>,
    message_rx: Receiver<WorkerMessage>,
}

impl IoCoordinator {
    /// Create a coordinator; nothing touches hardware until [`startup`](Self::startup)
    pub fn new(sdk: Arc<dyn DaqSdk>, settings: Box<dyn SettingsStore>, config: HubConfig) -> Self {
        let limits = VoltageLimits::new(config.default_limits.min(), config.default_limits.max())
            .unwrap_or_else(|e| {
                warn!("{}; falling back to default limits", e);
                VoltageLimits::default()
            });
        let sample_count = config.default_sample_count.max(1);
        let timing = WorkerTiming::from(&config);
        let (message_tx, message_rx) = mpsc::channel();

        Self {
            laser_output: Arc::new(AnalogOutputChannel::new(
                LASER_HANDLE,
                config.laser.output_channel.clone(),
                limits.clamp(0.0),
            )),
            laser_input: Arc::new(AnalogInputChannel::new(
                LASER_HANDLE,
                config.laser.input_channel.clone(),
                sample_count,
            )),
            use_average: Arc::new(AtomicBool::new(config.use_average)),
            events: EventSink::new(config.event_capacity),
            workers: Subsystem::ALL.map(|s| Worker::new(s, timing)),
            sdk,
            settings,
            config,
            limits,
            sample_count,
            auto_discover: false,
            devices: Vec::new(),
            outputs: Vec::new(),
            inputs: Vec::new(),
            ports: Vec::new(),
            message_tx,
            message_rx,
        }
    }

    /// Read stored configuration, then discover or load mappings
    ///
    /// With auto-discover set, mappings are loaded when the scan completes;
    /// otherwise they are loaded immediately.
    pub fn startup(&mut self) -> Result<(), HubError> {
        let stored_min = get_parsed::<f64>(self.settings.as_ref(), keys::MIN_VOLTAGE);
        let stored_max = get_parsed::<f64>(self.settings.as_ref(), keys::MAX_VOLTAGE);
        if stored_min.is_some() || stored_max.is_some() {
            let min = stored_min.unwrap_or(self.limits.min());
            let max = stored_max.unwrap_or(self.limits.max());
            match VoltageLimits::new(min, max) {
                Ok(limits) => self.apply_limits(limits),
                Err(e) => warn!("Ignoring stored limits: {}", e),
            }
        }

        match get_parsed::<usize>(self.settings.as_ref(), keys::SAMPLE_COUNT) {
            Some(0) => warn!("Ignoring stored sample count of zero"),
            Some(n) => self.apply_sample_count(n),
            None => {}
        }

        self.auto_discover =
            get_parsed::<bool>(self.settings.as_ref(), keys::AUTO_DISCOVER).unwrap_or(false);

        info!(
            "Coordinator ready: limits [{}, {}] V, {} sample(s), auto-discover {}",
            self.limits.min(),
            self.limits.max(),
            self.sample_count,
            self.auto_discover
        );

        if self.auto_discover {
            self.discover()
        } else {
            self.load_mappings();
            Ok(())
        }
    }

    /// Subscribe to coordinator events
    pub fn subscribe(&self) -> broadcast::Receiver<IoEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Discovery
    // -------------------------------------------------------------------------

    /// Start a device scan; does nothing while one is already running
    pub fn discover(&mut self) -> Result<(), HubError> {
        if self.is_enabled(Subsystem::Discovery) {
            debug!("Discovery already in progress");
            return Ok(());
        }
        // A finished scan has already posted its result; apply it before the next
        self.process_messages();

        if let Err(e) = self.launch(Subsystem::Discovery) {
            error!("Failed to start discovery: {}", e);
            self.events.error(Subsystem::Discovery.name(), e.to_string());
            return Err(e);
        }
        self.events.emit(IoEvent::DiscoveryStarted);
        Ok(())
    }

    /// Apply pending worker messages; returns how many were handled
    pub fn process_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.message_rx.try_recv() {
            handled += 1;
            match message {
                WorkerMessage::DiscoveryFinished(result) => self.finish_discovery(result),
            }
        }
        handled
    }

    fn finish_discovery(&mut self, result: Result<Vec<Device>, DetectError>) {
        // The loop posts its result just before exiting
        self.workers[Subsystem::Discovery.index()].stop();

        match result {
            Ok(devices) => {
                info!("Discovery finished: {} device(s)", devices.len());
                self.devices = devices;
                self.load_mappings();
                self.events.emit(IoEvent::DevicesUpdated {
                    devices: self.devices.clone(),
                });
            }
            Err(e) => {
                error!("Discovery failed: {}", e);
                self.events.error(Subsystem::Discovery.name(), e.to_string());
            }
        }
    }

    /// Devices found by the last scan
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Re-apply every stored mapping without writing them back
    pub fn load_mappings(&mut self) {
        debug!("Loading stored channel mappings");

        for slot in 0..self.config.analog_slots {
            let handle = ChannelHandle(slot);
            if let Some(name) = self.settings.get(&keys::analog_output(slot)) {
                if let Err(e) = self.set_output_channel(handle, &name, Persistence::Suppress) {
                    warn!("Stored analog output {}: {}", handle, e);
                }
            }
            if let Some(name) = self.settings.get(&keys::analog_input(slot)) {
                if let Err(e) = self.set_input_channel(handle, &name, Persistence::Suppress) {
                    warn!("Stored analog input {}: {}", handle, e);
                }
            }
        }

        for slot in 0..self.config.digital_slots {
            let handle = ChannelHandle(slot);
            if let Some(line) = self.settings.get(&keys::digital_output(slot)) {
                let inverted =
                    get_parsed::<bool>(self.settings.as_ref(), &keys::digital_inverted(slot))
                        .unwrap_or(false);
                if let Err(e) =
                    self.set_digital_output_channel(handle, &line, inverted, Persistence::Suppress)
                {
                    warn!("Stored digital output {}: {}", handle, e);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Worker control
    // -------------------------------------------------------------------------

    pub fn start_analog_output(&mut self) -> Result<(), HubError> {
        self.start_subsystem(Subsystem::AnalogOutput)
    }

    pub fn stop_analog_output(&mut self) {
        self.stop_subsystem(Subsystem::AnalogOutput);
    }

    pub fn start_analog_input(&mut self) -> Result<(), HubError> {
        self.start_subsystem(Subsystem::AnalogInput)
    }

    pub fn stop_analog_input(&mut self) {
        self.stop_subsystem(Subsystem::AnalogInput);
    }

    pub fn start_digital_output(&mut self) -> Result<(), HubError> {
        self.start_subsystem(Subsystem::DigitalOutput)
    }

    pub fn stop_digital_output(&mut self) {
        self.stop_subsystem(Subsystem::DigitalOutput);
    }

    pub fn start_laser_input(&mut self) -> Result<(), HubError> {
        self.start_subsystem(Subsystem::LaserInput)
    }

    pub fn stop_laser_input(&mut self) {
        self.stop_subsystem(Subsystem::LaserInput);
    }

    pub fn start_laser_output(&mut self) -> Result<(), HubError> {
        self.start_subsystem(Subsystem::LaserOutput)
    }

    pub fn stop_laser_output(&mut self) {
        self.stop_subsystem(Subsystem::LaserOutput);
    }

    /// Whether a subsystem's worker is running
    pub fn is_enabled(&self, subsystem: Subsystem) -> bool {
        self.workers[subsystem.index()].is_running()
    }

    /// Start a worker and announce it
    ///
    /// The enabled event is raised only once setup has fully succeeded.
    pub fn start_subsystem(&mut self, subsystem: Subsystem) -> Result<(), HubError> {
        match self.launch(subsystem) {
            Ok(()) => {
                info!("{} enabled", subsystem);
                self.events.emit(IoEvent::SubsystemChanged {
                    subsystem,
                    enabled: true,
                });
                Ok(())
            }
            Err(e) => {
                error!("Failed to start {}: {}", subsystem, e);
                self.events.error(subsystem.name(), e.to_string());
                Err(e)
            }
        }
    }

    /// Stop a worker and announce it; does nothing if it is not running
    pub fn stop_subsystem(&mut self, subsystem: Subsystem) {
        let worker = &mut self.workers[subsystem.index()];
        if !worker.is_running() {
            return;
        }
        worker.stop();
        info!("{} disabled", subsystem);
        self.events.emit(IoEvent::SubsystemChanged {
            subsystem,
            enabled: false,
        });
    }

    fn has_channels(&self, subsystem: Subsystem) -> bool {
        match subsystem {
            Subsystem::AnalogOutput => !self.outputs.is_empty(),
            Subsystem::AnalogInput => !self.inputs.is_empty(),
            Subsystem::DigitalOutput => self.ports.iter().any(|p| !p.is_empty()),
            Subsystem::Discovery | Subsystem::LaserInput | Subsystem::LaserOutput => true,
        }
    }

    /// Build the subsystem's loop from the current maps and start it
    fn launch(&mut self, subsystem: Subsystem) -> Result<(), HubError> {
        if self.is_enabled(subsystem) {
            return Err(HubError::AlreadyRunning(subsystem));
        }
        if !self.has_channels(subsystem) {
            return Err(HubError::NoChannels(subsystem));
        }

        let io = IoContext::new(self.sdk.clone(), self.events.clone(), &self.config);
        let worker = &mut self.workers[subsystem.index()];

        match subsystem {
            Subsystem::Discovery => worker.start(DiscoveryLoop::new(
                DeviceScanner::new(self.sdk.clone()),
                self.message_tx.clone(),
            )),
            Subsystem::AnalogOutput => {
                worker.start(AnalogOutputLoop::new(io, "analog-out", self.outputs.clone()))
            }
            Subsystem::LaserOutput => worker.start(AnalogOutputLoop::new(
                io,
                "laser-out",
                vec![self.laser_output.clone()],
            )),
            Subsystem::AnalogInput => worker.start(AnalogInputLoop::new(
                io,
                "analog-in",
                InputPublisher::Channels,
                self.inputs.clone(),
                self.use_average.clone(),
            )),
            Subsystem::LaserInput => worker.start(AnalogInputLoop::new(
                io,
                "laser-in",
                InputPublisher::Laser,
                vec![self.laser_input.clone()],
                self.use_average.clone(),
            )),
            Subsystem::DigitalOutput => {
                worker.start(DigitalOutputLoop::new(io, self.ports.clone()))
            }
        }
    }

    /// Stop a worker ahead of a map edit; returns whether it was running
    fn pause(&mut self, subsystem: Subsystem) -> bool {
        let worker = &mut self.workers[subsystem.index()];
        if !worker.is_running() {
            return false;
        }
        debug!("Pausing {} for a mapping change", subsystem);
        worker.stop();
        true
    }

    /// Restart a paused worker if it still has channels
    fn resume(&mut self, subsystem: Subsystem, was_running: bool) -> Result<(), HubError> {
        if !was_running {
            return Ok(());
        }
        if !self.has_channels(subsystem) {
            info!("{} disabled: no channels left", subsystem);
            self.events.emit(IoEvent::SubsystemChanged {
                subsystem,
                enabled: false,
            });
            return Ok(());
        }

        if let Err(e) = self.launch(subsystem) {
            error!("Failed to restart {}: {}", subsystem, e);
            self.events.error(subsystem.name(), e.to_string());
            self.events.emit(IoEvent::SubsystemChanged {
                subsystem,
                enabled: false,
            });
            return Err(e);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mappings
    // -------------------------------------------------------------------------

    /// Map an analog output handle to a physical channel; an empty name unmaps
    ///
    /// Re-mapping keeps the handle's current setpoint.
    pub fn set_output_channel(
        &mut self,
        handle: ChannelHandle,
        physical: &str,
        persistence: Persistence,
    ) -> Result<(), HubError> {
        let physical = physical.trim();
        let was_running = self.pause(Subsystem::AnalogOutput);

        let index = self.outputs.iter().position(|c| c.handle() == handle);
        match (index, physical.is_empty()) {
            (Some(i), true) => {
                self.outputs.remove(i);
                info!("Analog output {} unmapped", handle);
            }
            (Some(i), false) => {
                let voltage = self.outputs[i].voltage();
                self.outputs[i] = Arc::new(AnalogOutputChannel::new(handle, physical, voltage));
                info!("Analog output {} -> {}", handle, physical);
            }
            (None, false) => {
                let voltage = self.limits.clamp(0.0);
                self.outputs
                    .push(Arc::new(AnalogOutputChannel::new(handle, physical, voltage)));
                info!("Analog output {} -> {}", handle, physical);
            }
            (None, true) => {}
        }

        if persistence == Persistence::Persist {
            self.persist_slot(handle, self.config.analog_slots, keys::analog_output, physical);
        }
        self.resume(Subsystem::AnalogOutput, was_running)
    }

    /// Map an analog input handle to a physical channel; an empty name unmaps
    pub fn set_input_channel(
        &mut self,
        handle: ChannelHandle,
        physical: &str,
        persistence: Persistence,
    ) -> Result<(), HubError> {
        let physical = physical.trim();
        let was_running = self.pause(Subsystem::AnalogInput);

        let index = self.inputs.iter().position(|c| c.handle() == handle);
        let channel = (!physical.is_empty())
            .then(|| Arc::new(AnalogInputChannel::new(handle, physical, self.sample_count)));
        match (index, channel) {
            (Some(i), None) => {
                self.inputs.remove(i);
                info!("Analog input {} unmapped", handle);
            }
            (Some(i), Some(channel)) => {
                self.inputs[i] = channel;
                info!("Analog input {} -> {}", handle, physical);
            }
            (None, Some(channel)) => {
                self.inputs.push(channel);
                info!("Analog input {} -> {}", handle, physical);
            }
            (None, None) => {}
        }

        if persistence == Persistence::Persist {
            self.persist_slot(handle, self.config.analog_slots, keys::analog_input, physical);
        }
        self.resume(Subsystem::AnalogInput, was_running)
    }

    /// Map a digital output handle to a line (`Dev1/port0/line3`); an empty name unmaps
    ///
    /// An unparsable line name is rejected before anything changes. A newly
    /// mapped line starts logically disabled.
    pub fn set_digital_output_channel(
        &mut self,
        handle: ChannelHandle,
        line: &str,
        inverted: bool,
        persistence: Persistence,
    ) -> Result<(), HubError> {
        let line = line.trim();
        let parsed = if line.is_empty() {
            None
        } else {
            Some(DigitalLineName::parse(line)?)
        };

        let was_running = self.pause(Subsystem::DigitalOutput);

        for port in &self.ports {
            port.remove(handle);
        }
        self.ports.retain(|p| !p.is_empty());

        match parsed {
            Some(parsed) => {
                let port = match self.ports.iter().find(|p| p.physical() == parsed.port) {
                    Some(port) => port.clone(),
                    None => {
                        let port = Arc::new(DigitalPort::new(parsed.port.clone()));
                        self.ports.push(port.clone());
                        port
                    }
                };
                port.insert(DigitalLine::new(handle, parsed.line, inverted));
                info!(
                    "Digital output {} -> {}{}",
                    handle,
                    parsed,
                    if inverted { " (inverted)" } else { "" }
                );
            }
            None => info!("Digital output {} unmapped", handle),
        }

        if persistence == Persistence::Persist {
            let slots = self.config.digital_slots;
            self.persist_slot(handle, slots, keys::digital_output, line);
            self.persist_slot(
                handle,
                slots,
                keys::digital_inverted,
                if inverted { "true" } else { "false" },
            );
        }
        self.resume(Subsystem::DigitalOutput, was_running)
    }

    fn output(&self, handle: ChannelHandle) -> Option<&Arc<AnalogOutputChannel>> {
        self.outputs.iter().find(|c| c.handle() == handle)
    }

    fn input(&self, handle: ChannelHandle) -> Option<&Arc<AnalogInputChannel>> {
        self.inputs.iter().find(|c| c.handle() == handle)
    }

    fn digital_line(&self, handle: ChannelHandle) -> Option<(&Arc<DigitalPort>, DigitalLine)> {
        self.ports
            .iter()
            .find_map(|port| port.line(handle).map(|line| (port, line)))
    }

    /// Physical channel mapped to an analog output handle
    pub fn output_channel(&self, handle: ChannelHandle) -> Option<String> {
        self.output(handle).map(|c| c.physical().to_string())
    }

    /// Physical channel mapped to an analog input handle
    pub fn input_channel(&self, handle: ChannelHandle) -> Option<String> {
        self.input(handle).map(|c| c.physical().to_string())
    }

    /// Line name mapped to a digital output handle
    pub fn digital_output_channel(&self, handle: ChannelHandle) -> Option<String> {
        self.digital_line(handle)
            .map(|(port, line)| format!("{}/line{}", port.physical(), line.bit))
    }

    pub fn output_handles(&self) -> Vec<ChannelHandle> {
        self.outputs.iter().map(|c| c.handle()).collect()
    }

    pub fn input_handles(&self) -> Vec<ChannelHandle> {
        self.inputs.iter().map(|c| c.handle()).collect()
    }

    pub fn digital_output_handles(&self) -> Vec<ChannelHandle> {
        self.ports
            .iter()
            .flat_map(|p| p.lines().into_iter().map(|l| l.handle))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Values
    // -------------------------------------------------------------------------

    /// Clamp and store a setpoint; the output worker writes it on its next tick
    ///
    /// Returns the stored value, or `None` if the handle is not mapped.
    pub fn set_output_voltage(&self, handle: ChannelHandle, voltage: f64) -> Option<f64> {
        let Some(channel) = self.output(handle) else {
            warn!("No analog output mapped to {}", handle);
            return None;
        };
        let clamped = self.limits.clamp(voltage);
        if clamped != voltage {
            debug!("Clamped {} V to {} V on {}", voltage, clamped, handle);
        }
        channel.set_voltage(clamped);
        Some(clamped)
    }

    pub fn output_voltage(&self, handle: ChannelHandle) -> Option<f64> {
        self.output(handle).map(|c| c.voltage())
    }

    /// Set a line's logical state; the whole port word is recomputed
    ///
    /// Returns false if the handle is not mapped.
    pub fn set_digital_output_enabled(&self, handle: ChannelHandle, enabled: bool) -> bool {
        for port in &self.ports {
            if let Some(word) = port.set_enabled(handle, enabled) {
                debug!("{} word now {:#b}", port.physical(), word);
                self.events
                    .emit(IoEvent::DigitalOutputChanged { handle, enabled });
                return true;
            }
        }
        warn!("No digital output mapped to {}", handle);
        false
    }

    /// Logical state of a line; false for unmapped handles
    pub fn digital_output_enabled(&self, handle: ChannelHandle) -> bool {
        match self.digital_line(handle) {
            Some((_, line)) => line.enabled,
            None => {
                warn!("No digital output mapped to {}", handle);
                false
            }
        }
    }

    /// Inversion flag of a line; false for unmapped handles
    pub fn digital_output_inverted(&self, handle: ChannelHandle) -> bool {
        match self.digital_line(handle) {
            Some((_, line)) => line.inverted,
            None => {
                warn!("No digital output mapped to {}", handle);
                false
            }
        }
    }

    /// Last raw sample; 0.0 for unmapped handles
    pub fn analog_input_value(&self, handle: ChannelHandle) -> f64 {
        match self.input(handle) {
            Some(channel) => channel.value(),
            None => {
                warn!("No analog input mapped to {}", handle);
                0.0
            }
        }
    }

    /// Last running mean; 0.0 for unmapped handles
    pub fn analog_input_average(&self, handle: ChannelHandle) -> f64 {
        match self.input(handle) {
            Some(channel) => channel.average(),
            None => {
                warn!("No analog input mapped to {}", handle);
                0.0
            }
        }
    }

    // -------------------------------------------------------------------------
    // Laser
    // -------------------------------------------------------------------------

    /// Clamp and store the laser setpoint; returns the stored value
    pub fn set_laser_voltage(&self, voltage: f64) -> f64 {
        let clamped = self.limits.clamp(voltage);
        self.laser_output.set_voltage(clamped);
        clamped
    }

    pub fn laser_output_voltage(&self) -> f64 {
        self.laser_output.voltage()
    }

    pub fn laser_input_value(&self) -> f64 {
        self.laser_input.value()
    }

    pub fn laser_input_average(&self) -> f64 {
        self.laser_input.average()
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    pub fn voltage_limits(&self) -> VoltageLimits {
        self.limits
    }

    /// Change the output limits; existing setpoints are pulled inside them
    pub fn set_voltage_limits(&mut self, min: f64, max: f64) -> Result<(), HubError> {
        let limits = VoltageLimits::new(min, max)?;
        self.apply_limits(limits);
        self.persist(keys::MIN_VOLTAGE, &min.to_string());
        self.persist(keys::MAX_VOLTAGE, &max.to_string());
        Ok(())
    }

    fn apply_limits(&mut self, limits: VoltageLimits) {
        self.limits = limits;
        for channel in self.outputs.iter().chain(iter::once(&self.laser_output)) {
            channel.reclamp(&limits);
        }
        info!("Output limits [{}, {}] V", limits.min(), limits.max());
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Change the averaging window; every buffer is reset
    pub fn set_sample_count(&mut self, count: usize) -> Result<(), HubError> {
        if count == 0 {
            return Err(HubError::InvalidSampleCount);
        }
        self.apply_sample_count(count);
        self.persist(keys::SAMPLE_COUNT, &count.to_string());
        Ok(())
    }

    fn apply_sample_count(&mut self, count: usize) {
        self.sample_count = count;
        for channel in self.inputs.iter().chain(iter::once(&self.laser_input)) {
            channel.reset(count);
        }
        info!("Averaging over {} sample(s)", count);
    }

    pub fn use_average(&self) -> bool {
        self.use_average.load(Ordering::Relaxed)
    }

    /// Publish running means instead of raw samples; takes effect on the next tick
    pub fn set_use_average(&self, enabled: bool) {
        self.use_average.store(enabled, Ordering::Relaxed);
    }

    pub fn auto_discover(&self) -> bool {
        self.auto_discover
    }

    pub fn set_auto_discover(&mut self, enabled: bool) {
        self.auto_discover = enabled;
        self.persist(keys::AUTO_DISCOVER, if enabled { "true" } else { "false" });
    }

    fn persist(&mut self, key: &str, value: &str) {
        if let Err(e) = self.settings.set(key, value) {
            error!("Failed to store {}: {}", key, e);
            self.events.error("settings", e.to_string());
        }
    }

    fn persist_slot(
        &mut self,
        handle: ChannelHandle,
        slots: u32,
        key: fn(u32) -> String,
        value: &str,
    ) {
        if handle.0 >= slots {
            debug!("{} is outside the {} stored slot(s); not persisted", handle, slots);
            return;
        }
        self.persist(&key(handle.0), value);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// React to an operating system power notification
    pub fn handle_power_event(&mut self, event: PowerEvent) {
        match event {
            PowerEvent::SuspendImminent => {
                info!("Suspend imminent: stopping all I/O");
                for subsystem in Subsystem::IO {
                    self.stop_subsystem(subsystem);
                }
            }
        }
    }

    /// Stop every worker
    pub fn shutdown(&mut self) {
        for subsystem in Subsystem::IO {
            self.stop_subsystem(subsystem);
        }
        self.workers[Subsystem::Discovery.index()].stop();
    }
}

impl Drop for IoCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
