//! Integration tests for the I/O coordinator
//!
//! These run the real workers against the simulated SDK and verify:
//! - Mapping replace/remove semantics and persistence
//! - Voltage clamping, write coalescing and running averages
//! - Digital port packing and the fail-safe word on stop
//! - Subsystem lifecycle: failed starts, restarts on remap, suspend
//! - Device discovery and reloading of stored mappings

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use daq_hub::{
    keys, ChannelHandle, HubConfig, HubError, IoCoordinator, IoEvent, JsonFileStore,
    MemorySettingsStore, Persistence, PowerEvent, SettingsStore, Subsystem,
};
use daq_sdk::diagnostics::codes;
use daq_sdk::SdkError;
use daq_sim::{SimDevice, SimFault, SimOp, SimulatedSdk};
use tokio::sync::broadcast::{error::TryRecvError, Receiver};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Config with a short tick so tests settle quickly
    pub fn fast_config() -> HubConfig {
        HubConfig {
            tick_interval_ms: 5,
            ..Default::default()
        }
    }

    pub fn hub_with(sim: &Arc<SimulatedSdk>, store: impl SettingsStore + 'static) -> IoCoordinator {
        IoCoordinator::new(sim.clone(), Box::new(store), fast_config())
    }

    pub fn hub(sim: &Arc<SimulatedSdk>) -> IoCoordinator {
        hub_with(sim, MemorySettingsStore::new())
    }

    pub fn sim() -> Arc<SimulatedSdk> {
        Arc::new(SimulatedSdk::new())
    }

    /// Poll `cond` for up to five seconds
    pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    /// Collect every event currently queued
    pub fn drain(rx: &mut Receiver<IoEvent>) -> Vec<IoEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }

    pub fn has_change(events: &[IoEvent], subsystem: Subsystem, enabled: bool) -> bool {
        events.iter().any(|e| {
            matches!(
                e,
                IoEvent::SubsystemChanged { subsystem: s, enabled: en }
                    if *s == subsystem && *en == enabled
            )
        })
    }

    pub fn has_error(events: &[IoEvent]) -> bool {
        events.iter().any(|e| matches!(e, IoEvent::Error { .. }))
    }

    pub fn temp_settings(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("daq-hub-it-{}-{}", std::process::id(), name))
            .join("settings.json")
    }
}

// ============================================================================
// Mapping Tests
// ============================================================================

mod mapping_tests {
    use super::*;

    #[test]
    fn remap_replaces_rather_than_appends() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let h = ChannelHandle(2);

        hub.set_output_channel(h, "Dev1/ao0", Persistence::Persist)
            .unwrap();
        hub.set_output_channel(h, "Dev1/ao1", Persistence::Persist)
            .unwrap();
        hub.set_input_channel(h, "Dev1/ai0", Persistence::Persist)
            .unwrap();
        hub.set_input_channel(h, "Dev1/ai3", Persistence::Persist)
            .unwrap();

        assert_eq!(hub.output_handles(), vec![h]);
        assert_eq!(hub.output_channel(h).as_deref(), Some("Dev1/ao1"));
        assert_eq!(hub.input_handles(), vec![h]);
        assert_eq!(hub.input_channel(h).as_deref(), Some("Dev1/ai3"));
    }

    #[test]
    fn remove_is_idempotent() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let h = ChannelHandle(0);

        hub.set_digital_output_channel(h, "Dev1/port0/line1", false, Persistence::Persist)
            .unwrap();
        for _ in 0..2 {
            hub.set_digital_output_channel(h, "", false, Persistence::Persist)
                .unwrap();
            assert!(hub.digital_output_handles().is_empty());
            assert_eq!(hub.digital_output_channel(h), None);
        }
    }

    #[test]
    fn digital_remap_moves_line_between_ports() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let h = ChannelHandle(4);

        hub.set_digital_output_channel(h, "Dev1/port0/line1", false, Persistence::Persist)
            .unwrap();
        hub.set_digital_output_channel(h, "Dev1/port1/line2", true, Persistence::Persist)
            .unwrap();

        assert_eq!(hub.digital_output_handles(), vec![h]);
        assert_eq!(
            hub.digital_output_channel(h).as_deref(),
            Some("Dev1/port1/line2")
        );
        assert!(hub.digital_output_inverted(h));
        assert!(!hub.digital_output_enabled(h));
    }

    #[test]
    fn new_output_starts_inside_limits() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        hub.set_voltage_limits(1.0, 5.0).unwrap();

        let h = ChannelHandle(0);
        hub.set_output_channel(h, "Dev1/ao0", Persistence::Persist)
            .unwrap();
        assert_eq!(hub.output_voltage(h), Some(1.0));
    }

    #[test]
    fn mappings_survive_restart() {
        let path = helpers::temp_settings("restart");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
        let sim = helpers::sim();

        {
            let mut hub = helpers::hub_with(&sim, JsonFileStore::open(&path).unwrap());
            hub.startup().unwrap();
            hub.set_output_channel(ChannelHandle(1), "Dev1/ao1", Persistence::Persist)
                .unwrap();
            hub.set_input_channel(ChannelHandle(3), "Dev1/ai5", Persistence::Persist)
                .unwrap();
            hub.set_digital_output_channel(
                ChannelHandle(8),
                "Dev1/port1/line3",
                true,
                Persistence::Persist,
            )
            .unwrap();
            // Outside the stored slots
            hub.set_output_channel(ChannelHandle(40), "Dev1/ao0", Persistence::Persist)
                .unwrap();
            hub.set_sample_count(7).unwrap();
            hub.set_voltage_limits(-2.0, 3.0).unwrap();
        }

        let mut hub = helpers::hub_with(&sim, JsonFileStore::open(&path).unwrap());
        hub.startup().unwrap();

        assert_eq!(
            hub.output_channel(ChannelHandle(1)).as_deref(),
            Some("Dev1/ao1")
        );
        assert_eq!(
            hub.input_channel(ChannelHandle(3)).as_deref(),
            Some("Dev1/ai5")
        );
        assert_eq!(
            hub.digital_output_channel(ChannelHandle(8)).as_deref(),
            Some("Dev1/port1/line3")
        );
        assert!(hub.digital_output_inverted(ChannelHandle(8)));
        assert_eq!(hub.output_channel(ChannelHandle(40)), None);
        assert_eq!(hub.sample_count(), 7);
        assert_eq!(hub.voltage_limits().min(), -2.0);
        assert_eq!(hub.voltage_limits().max(), 3.0);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn suppressed_mappings_are_not_stored() {
        let path = helpers::temp_settings("suppress");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
        let sim = helpers::sim();

        {
            let mut hub = helpers::hub_with(&sim, JsonFileStore::open(&path).unwrap());
            hub.set_output_channel(ChannelHandle(0), "Dev1/ao0", Persistence::Suppress)
                .unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get(&keys::analog_output(0)), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);

        assert!(matches!(
            hub.set_voltage_limits(2.0, 1.0),
            Err(HubError::InvalidLimits { .. })
        ));
        assert!(matches!(
            hub.set_sample_count(0),
            Err(HubError::InvalidSampleCount)
        ));
        assert!(matches!(
            hub.set_digital_output_channel(
                ChannelHandle(0),
                "Dev1/port0",
                false,
                Persistence::Persist
            ),
            Err(HubError::Sdk(SdkError::Configuration(_)))
        ));
    }
}

// ============================================================================
// Analog Tests
// ============================================================================

mod analog_tests {
    use super::*;

    #[test]
    fn setpoints_are_clamped() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let h = ChannelHandle(0);
        hub.set_output_channel(h, "Dev1/ao0", Persistence::Persist)
            .unwrap();
        hub.set_voltage_limits(0.3, 0.7).unwrap();

        assert_eq!(hub.set_output_voltage(h, 0.9), Some(0.7));
        assert_eq!(hub.set_output_voltage(h, 0.1), Some(0.3));
        assert_eq!(hub.set_output_voltage(h, 0.5), Some(0.5));
        assert_eq!(hub.set_laser_voltage(2.0), 0.7);
    }

    #[test]
    fn narrowing_limits_pulls_setpoints_in() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let h = ChannelHandle(0);
        hub.set_output_channel(h, "Dev1/ao0", Persistence::Persist)
            .unwrap();
        hub.set_output_voltage(h, 8.0);

        hub.set_voltage_limits(-1.0, 1.0).unwrap();
        assert_eq!(hub.output_voltage(h), Some(1.0));
    }

    #[test]
    fn pending_writes_coalesce() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let h = ChannelHandle(0);
        hub.set_output_channel(h, "Dev1/ao0", Persistence::Persist)
            .unwrap();

        hub.set_output_voltage(h, 1.0);
        hub.set_output_voltage(h, 2.0);
        hub.start_analog_output().unwrap();

        assert!(helpers::wait_until(|| !sim.analog_writes("Dev1/ao0").is_empty()));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sim.analog_writes("Dev1/ao0"), vec![2.0]);

        hub.set_output_voltage(h, 3.0);
        assert!(helpers::wait_until(|| sim.analog_writes("Dev1/ao0").len() == 2));
        assert_eq!(sim.analog_writes("Dev1/ao0"), vec![2.0, 3.0]);
    }

    #[test]
    fn failed_write_is_retried() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let mut rx = hub.subscribe();
        let h = ChannelHandle(0);
        hub.set_output_channel(h, "Dev1/ao0", Persistence::Persist)
            .unwrap();

        sim.inject(SimFault::on(SimOp::WriteAnalog, "Dev1/ao0", codes::WRITE_TIMEOUT));
        hub.start_analog_output().unwrap();
        hub.set_output_voltage(h, 1.5);

        assert!(helpers::wait_until(|| helpers::has_error(&helpers::drain(&mut rx))));
        assert!(sim.analog_writes("Dev1/ao0").is_empty());

        sim.clear_faults();
        assert!(helpers::wait_until(|| sim.analog_writes("Dev1/ao0") == vec![1.5]));
        assert!(hub.is_enabled(Subsystem::AnalogOutput));
    }

    #[test]
    fn inputs_publish_running_mean() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let mut rx = hub.subscribe();
        let h = ChannelHandle(1);

        hub.set_sample_count(3).unwrap();
        hub.set_input_channel(h, "Dev1/ai0", Persistence::Persist)
            .unwrap();
        hub.set_use_average(true);
        sim.push_samples("Dev1/ai0", &[1.0, 2.0, 3.0, 4.0]);
        sim.set_resting_value("Dev1/ai0", 4.0);
        hub.start_analog_input().unwrap();

        let mut values = Vec::new();
        assert!(helpers::wait_until(|| {
            for event in helpers::drain(&mut rx) {
                if let IoEvent::AnalogInputValue {
                    handle,
                    value,
                    averaged,
                } = event
                {
                    assert_eq!(handle, h);
                    assert!(averaged);
                    values.push(value);
                }
            }
            values.len() >= 4
        }));
        assert_eq!(&values[..4], &[1.0, 1.5, 2.0, 3.0]);

        hub.stop_analog_input();
        assert_eq!(hub.analog_input_value(h), 4.0);
    }

    #[test]
    fn raw_values_when_not_averaging() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let h = ChannelHandle(0);
        hub.set_input_channel(h, "Dev1/ai2", Persistence::Persist)
            .unwrap();
        sim.set_resting_value("Dev1/ai2", 0.25);
        hub.start_analog_input().unwrap();

        assert!(helpers::wait_until(|| hub.analog_input_value(h) == 0.25));
        assert!(helpers::wait_until(|| hub.analog_input_average(h) == 0.25));
    }

    fn next_value(rx: &mut Receiver<IoEvent>) -> Option<f64> {
        let mut found = None;
        helpers::wait_until(|| {
            found = helpers::drain(rx).into_iter().find_map(|e| match e {
                IoEvent::AnalogInputValue { value, .. } => Some(value),
                _ => None,
            });
            found.is_some()
        });
        found
    }

    #[test]
    fn resizing_window_keeps_mapping_and_clears_samples() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let h = ChannelHandle(0);

        hub.set_sample_count(4).unwrap();
        hub.set_input_channel(h, "Dev1/ai0", Persistence::Persist)
            .unwrap();
        hub.set_use_average(true);
        sim.set_resting_value("Dev1/ai0", 1.0);
        hub.start_analog_input().unwrap();
        assert!(helpers::wait_until(|| hub.analog_input_average(h) == 1.0));
        hub.stop_analog_input();

        hub.set_sample_count(2).unwrap();
        assert_eq!(hub.input_channel(h).as_deref(), Some("Dev1/ai0"));
        assert_eq!(hub.input_handles(), vec![h]);
        assert_eq!(hub.sample_count(), 2);

        // With the old 1.0 samples gone, the first mean is the new sample alone
        sim.set_resting_value("Dev1/ai0", 5.0);
        let mut rx = hub.subscribe();
        hub.start_analog_input().unwrap();
        assert_eq!(next_value(&mut rx), Some(5.0));
    }
}

// ============================================================================
// Digital Tests
// ============================================================================

mod digital_tests {
    use super::*;

    #[test]
    fn lines_are_packed_into_one_word() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let (a, b, c) = (ChannelHandle(0), ChannelHandle(1), ChannelHandle(2));

        hub.set_digital_output_channel(a, "Dev1/port0/line0", false, Persistence::Persist)
            .unwrap();
        hub.set_digital_output_channel(b, "Dev1/port0/line1", true, Persistence::Persist)
            .unwrap();
        hub.set_digital_output_channel(c, "Dev1/port0/line3", false, Persistence::Persist)
            .unwrap();
        hub.start_digital_output().unwrap();

        // All disabled: only the inverted line is high
        assert!(helpers::wait_until(
            || sim.digital_writes("Dev1/port0").last() == Some(&0b0010)
        ));

        assert!(hub.set_digital_output_enabled(a, true));
        assert!(hub.set_digital_output_enabled(c, true));
        assert!(hub.set_digital_output_enabled(b, true));
        assert!(helpers::wait_until(
            || sim.digital_writes("Dev1/port0").last() == Some(&0b1001)
        ));
        assert!(hub.digital_output_enabled(a));
    }

    #[test]
    fn stop_writes_fail_safe_word() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let (a, b) = (ChannelHandle(0), ChannelHandle(1));

        hub.set_digital_output_channel(a, "Dev1/port0/line2", false, Persistence::Persist)
            .unwrap();
        hub.set_digital_output_channel(b, "Dev1/port0/line5", true, Persistence::Persist)
            .unwrap();
        hub.start_digital_output().unwrap();
        hub.set_digital_output_enabled(a, true);
        hub.set_digital_output_enabled(b, true);
        assert!(helpers::wait_until(
            || sim.digital_writes("Dev1/port0").last() == Some(&0b0000_0100)
        ));

        hub.stop_digital_output();
        assert_eq!(
            sim.digital_writes("Dev1/port0").last(),
            Some(&0b0010_0000)
        );
        assert_eq!(sim.live_tasks(), 0);

        // Logical states survive the stop and are rewritten on restart
        assert!(hub.digital_output_enabled(a));
        hub.start_digital_output().unwrap();
        assert!(helpers::wait_until(
            || sim.digital_writes("Dev1/port0").last() == Some(&0b0000_0100)
        ));
    }

    #[test]
    fn line_outside_port_fails_start() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);

        // port2 of a USB-6001 is one line wide
        hub.set_digital_output_channel(
            ChannelHandle(0),
            "Dev1/port2/line1",
            false,
            Persistence::Persist,
        )
        .unwrap();

        assert!(matches!(
            hub.start_digital_output(),
            Err(HubError::Sdk(SdkError::Configuration(_)))
        ));
        assert!(!hub.is_enabled(Subsystem::DigitalOutput));
        assert_eq!(sim.live_tasks(), 0);
    }

    #[test]
    fn zero_width_port_fails_start() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        sim.set_port_width("Dev1/port0", 0);

        hub.set_digital_output_channel(
            ChannelHandle(0),
            "Dev1/port0/line0",
            false,
            Persistence::Persist,
        )
        .unwrap();

        assert!(hub.start_digital_output().is_err());
        assert!(!hub.is_enabled(Subsystem::DigitalOutput));
    }
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[test]
    fn failed_start_leaves_subsystem_disabled() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let mut rx = hub.subscribe();

        hub.set_output_channel(ChannelHandle(0), "Dev1/ao0", Persistence::Persist)
            .unwrap();
        hub.set_output_channel(ChannelHandle(1), "Dev1/ao1", Persistence::Persist)
            .unwrap();
        sim.inject(SimFault::on(
            SimOp::CreateChannel,
            "Dev1/ao1",
            codes::RESOURCE_RESERVED,
        ));

        let err = hub.start_analog_output().unwrap_err();
        assert!(matches!(err, HubError::Sdk(ref e) if e.code().is_some()));
        assert!(!hub.is_enabled(Subsystem::AnalogOutput));
        assert_eq!(sim.live_tasks(), 0);

        let events = helpers::drain(&mut rx);
        assert!(helpers::has_error(&events));
        assert!(!helpers::has_change(&events, Subsystem::AnalogOutput, true));
    }

    #[test]
    fn start_twice_is_rejected() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        hub.set_output_channel(ChannelHandle(0), "Dev1/ao0", Persistence::Persist)
            .unwrap();

        hub.start_analog_output().unwrap();
        assert!(matches!(
            hub.start_analog_output(),
            Err(HubError::AlreadyRunning(Subsystem::AnalogOutput))
        ));
        assert_eq!(sim.live_tasks(), 1);
    }

    #[test]
    fn remap_restarts_running_worker() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let mut rx = hub.subscribe();
        let h = ChannelHandle(0);

        hub.set_output_channel(h, "Dev1/ao0", Persistence::Persist)
            .unwrap();
        // Set before starting so the first tick writes it
        hub.set_output_voltage(h, 1.0);
        hub.start_analog_output().unwrap();
        assert!(helpers::wait_until(|| sim.analog_writes("Dev1/ao0") == vec![1.0]));

        hub.set_output_channel(h, "Dev1/ao1", Persistence::Persist)
            .unwrap();
        assert!(hub.is_enabled(Subsystem::AnalogOutput));
        assert_eq!(sim.task_names().len(), 1);
        // The setpoint follows the handle to its new channel
        assert!(helpers::wait_until(|| sim.analog_writes("Dev1/ao1") == vec![1.0]));

        hub.set_output_channel(h, "", Persistence::Persist).unwrap();
        assert!(!hub.is_enabled(Subsystem::AnalogOutput));
        assert_eq!(sim.live_tasks(), 0);
        assert!(helpers::has_change(
            &helpers::drain(&mut rx),
            Subsystem::AnalogOutput,
            false
        ));
    }

    #[test]
    fn start_without_channels_fails() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        assert!(matches!(
            hub.start_digital_output(),
            Err(HubError::NoChannels(Subsystem::DigitalOutput))
        ));
        assert!(matches!(
            hub.start_analog_input(),
            Err(HubError::NoChannels(Subsystem::AnalogInput))
        ));
    }

    #[test]
    fn laser_lifecycle_events() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let mut rx = hub.subscribe();

        hub.start_laser_output().unwrap();
        hub.start_laser_input().unwrap();
        hub.set_laser_voltage(1.25);
        assert!(helpers::wait_until(
            || sim.analog_writes("Dev1/ao1").last() == Some(&1.25)
        ));
        assert_eq!(hub.laser_output_voltage(), 1.25);

        hub.stop_laser_output();
        hub.stop_laser_input();

        let events = helpers::drain(&mut rx);
        assert!(helpers::has_change(&events, Subsystem::LaserOutput, true));
        assert!(helpers::has_change(&events, Subsystem::LaserInput, true));
        assert!(helpers::has_change(&events, Subsystem::LaserOutput, false));
        assert!(helpers::has_change(&events, Subsystem::LaserInput, false));
        assert!(events
            .iter()
            .any(|e| matches!(e, IoEvent::LaserInputValue { .. })));
        assert_eq!(sim.live_tasks(), 0);
    }

    #[test]
    fn suspend_stops_all_io() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);

        hub.set_output_channel(ChannelHandle(0), "Dev1/ao0", Persistence::Persist)
            .unwrap();
        hub.set_input_channel(ChannelHandle(0), "Dev1/ai0", Persistence::Persist)
            .unwrap();
        hub.set_digital_output_channel(
            ChannelHandle(0),
            "Dev1/port0/line0",
            true,
            Persistence::Persist,
        )
        .unwrap();
        hub.start_analog_output().unwrap();
        hub.start_analog_input().unwrap();
        hub.start_digital_output().unwrap();
        hub.start_laser_output().unwrap();

        hub.handle_power_event(PowerEvent::SuspendImminent);

        for subsystem in Subsystem::IO {
            assert!(!hub.is_enabled(subsystem), "{subsystem} still running");
        }
        assert_eq!(sim.live_tasks(), 0);
        assert_eq!(sim.digital_writes("Dev1/port0").last(), Some(&0b1));
    }

    #[test]
    fn drop_releases_every_task() {
        let sim = helpers::sim();
        {
            let mut hub = helpers::hub(&sim);
            hub.set_output_channel(ChannelHandle(0), "Dev1/ao0", Persistence::Persist)
                .unwrap();
            hub.start_analog_output().unwrap();
            hub.start_laser_input().unwrap();
            assert_eq!(sim.live_tasks(), 2);
        }
        assert_eq!(sim.live_tasks(), 0);
    }
}

// ============================================================================
// Discovery Tests
// ============================================================================

mod discovery_tests {
    use super::*;

    fn wait_for_devices(hub: &mut IoCoordinator, rx: &mut Receiver<IoEvent>) -> Vec<IoEvent> {
        let mut events = Vec::new();
        assert!(helpers::wait_until(|| {
            hub.process_messages();
            events.extend(helpers::drain(rx));
            events.iter().any(|e| {
                matches!(e, IoEvent::DevicesUpdated { .. } | IoEvent::Error { .. })
            })
        }));
        events
    }

    #[test]
    fn discovery_tolerates_failing_queries() {
        let sim = Arc::new(SimulatedSdk::with_devices(vec![
            SimDevice::usb_6001("Dev1"),
            SimDevice::pcie_6321("Dev2"),
        ]));
        sim.inject(SimFault::on(
            SimOp::SerialNumber,
            "Dev2",
            codes::DEVICE_NOT_ACCESSIBLE,
        ));

        let mut hub = helpers::hub(&sim);
        let mut rx = hub.subscribe();
        hub.discover().unwrap();

        let events = wait_for_devices(&mut hub, &mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, IoEvent::DiscoveryStarted)));

        let devices = hub.devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].name, "Dev2");
        assert_eq!(devices[1].serial_number, 0);
        assert_eq!(devices[1].product_type, "PCIe-6321");
        assert!(!hub.is_enabled(Subsystem::Discovery));
    }

    #[test]
    fn rescan_applies_pending_result_first() {
        let sim = helpers::sim();
        let mut hub = helpers::hub(&sim);
        let mut rx = hub.subscribe();

        hub.discover().unwrap();
        // The scan finishes but its result is not yet applied
        assert!(helpers::wait_until(|| !hub.is_enabled(Subsystem::Discovery)));
        assert!(hub.devices().is_empty());

        sim.set_devices(vec![
            SimDevice::usb_6001("Dev1"),
            SimDevice::pcie_6321("Dev2"),
        ]);
        hub.discover().unwrap();
        assert_eq!(hub.devices().len(), 1);

        let mut updates = Vec::new();
        assert!(helpers::wait_until(|| {
            hub.process_messages();
            for event in helpers::drain(&mut rx) {
                if let IoEvent::DevicesUpdated { devices } = event {
                    updates.push(devices.len());
                }
            }
            updates.len() == 2
        }));
        assert_eq!(updates, vec![1, 2]);
        assert_eq!(hub.devices().len(), 2);
        assert!(!hub.is_enabled(Subsystem::Discovery));
    }

    #[test]
    fn discovery_failure_is_reported() {
        let sim = helpers::sim();
        sim.inject(SimFault::always(
            SimOp::DeviceNames,
            codes::DEVICE_NOT_ACCESSIBLE,
        ));

        let mut hub = helpers::hub(&sim);
        let mut rx = hub.subscribe();
        hub.discover().unwrap();

        let events = wait_for_devices(&mut hub, &mut rx);
        assert!(helpers::has_error(&events));
        assert!(hub.devices().is_empty());
    }

    #[test]
    fn auto_discover_reloads_stored_mappings() {
        let sim = helpers::sim();
        let store = MemorySettingsStore::with_entries([
            (keys::AUTO_DISCOVER.to_string(), "true".to_string()),
            (keys::analog_output(0), "Dev1/ao0".to_string()),
            (keys::digital_output(2), "Dev1/port1/line1".to_string()),
            (keys::digital_inverted(2), "true".to_string()),
        ]);

        let mut hub = helpers::hub_with(&sim, store);
        let mut rx = hub.subscribe();
        hub.startup().unwrap();

        // Mappings wait for the scan
        assert_eq!(hub.output_channel(ChannelHandle(0)), None);

        let events = wait_for_devices(&mut hub, &mut rx);
        assert!(!helpers::has_error(&events));
        assert_eq!(hub.devices().len(), 1);
        assert_eq!(
            hub.output_channel(ChannelHandle(0)).as_deref(),
            Some("Dev1/ao0")
        );
        assert!(hub.digital_output_inverted(ChannelHandle(2)));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// The handle map behaves like a plain map under any edit sequence
        #[test]
        fn output_map_matches_model(
            ops in prop::collection::vec((0u32..6, prop::option::of(0usize..2)), 1..30)
        ) {
            let sim = helpers::sim();
            let mut hub = helpers::hub(&sim);
            let mut model = BTreeMap::new();

            for (handle, channel) in ops {
                let name = channel.map(|c| format!("Dev1/ao{c}")).unwrap_or_default();
                hub.set_output_channel(ChannelHandle(handle), &name, Persistence::Suppress)
                    .unwrap();
                match channel {
                    Some(_) => { model.insert(handle, name); }
                    None => { model.remove(&handle); }
                }
            }

            let mut handles: Vec<u32> = hub.output_handles().iter().map(|h| h.0).collect();
            handles.sort_unstable();
            prop_assert_eq!(handles, model.keys().copied().collect::<Vec<_>>());
            for (handle, name) in &model {
                prop_assert_eq!(hub.output_channel(ChannelHandle(*handle)), Some(name.clone()));
            }
        }

        /// Stored setpoints always lie inside the limits
        #[test]
        fn setpoints_stay_in_limits(
            a in -20.0f64..20.0,
            b in -20.0f64..20.0,
            v in prop::num::f64::ANY,
        ) {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            let sim = helpers::sim();
            let mut hub = helpers::hub(&sim);
            hub.set_voltage_limits(min, max).unwrap();
            hub.set_output_channel(ChannelHandle(0), "Dev1/ao0", Persistence::Suppress)
                .unwrap();

            let stored = hub.set_output_voltage(ChannelHandle(0), v).unwrap();
            prop_assert!(stored >= min && stored <= max);
        }
    }
}
