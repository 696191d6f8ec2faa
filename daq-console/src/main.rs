//! DAQ Hub Console
//!
//! Runs the I/O coordinator against the simulated driver, prints coordinator
//! events and accepts line commands on stdin. Ctrl-C is treated as an
//! imminent suspend followed by shutdown.

mod commands;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use commands::{Command, HELP};
use daq_hub::{IoCoordinator, IoEvent, JsonFileStore, PowerEvent};
use daq_sim::SimulatedSdk;
use settings::ConsoleConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "daqhub=info,daq_sdk=info,daq_detect=info,daq_hub=info,daq_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DAQ hub");

    let dir = ConsoleConfig::config_dir().context("could not determine config directory")?;
    let config = ConsoleConfig::load(&dir)?;
    let store = JsonFileStore::open(ConsoleConfig::settings_path(&dir))?;
    tracing::info!("Settings: {}", store.path().display());

    let sdk = Arc::new(SimulatedSdk::with_devices(config.simulated_devices.clone()));
    let mut hub = IoCoordinator::new(sdk, Box::new(store), config.hub.clone());
    let mut events = hub.subscribe();
    hub.startup()?;

    println!("{HELP}");

    let mut pump = tokio::time::interval(Duration::from_millis(config.pump_interval_ms.max(1)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = pump.tick() => {
                hub.process_messages();
            }
            event = events.recv() => match event {
                Ok(event) => print_event(&event, config.show_values),
                Err(RecvError::Lagged(n)) => tracing::debug!("Dropped {} event(s)", n),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match Command::parse(&line) {
                    Ok(command) => match command.apply(&mut hub) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => eprintln!("error: {e}"),
                    },
                    Err(e) => eprintln!("{e}; try 'help'"),
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                hub.handle_power_event(PowerEvent::SuspendImminent);
                break;
            }
        }
    }

    hub.shutdown();
    tracing::info!("DAQ hub stopped");
    Ok(())
}

fn print_event(event: &IoEvent, show_values: bool) {
    match event {
        IoEvent::DiscoveryStarted => println!("discovery started"),
        IoEvent::DevicesUpdated { devices } => {
            println!("{} device(s):", devices.len());
            for device in devices {
                println!(
                    "  {} {} ({} AI, {} AO, {} DO ports)",
                    device.name,
                    device.product_type,
                    device.analog_inputs.len(),
                    device.analog_outputs.len(),
                    device.digital_output_ports().len()
                );
            }
        }
        IoEvent::SubsystemChanged { subsystem, enabled } => {
            println!("{} {}", subsystem, if *enabled { "enabled" } else { "disabled" })
        }
        IoEvent::AnalogInputValue {
            handle,
            value,
            averaged,
        } if show_values => println!(
            "ai {} = {:.4}{}",
            handle,
            value,
            if *averaged { " (mean)" } else { "" }
        ),
        IoEvent::LaserInputValue { value, averaged } if show_values => println!(
            "laser in = {:.4}{}",
            value,
            if *averaged { " (mean)" } else { "" }
        ),
        IoEvent::DigitalOutputChanged { handle, enabled } => {
            println!("do {} {}", handle, if *enabled { "on" } else { "off" })
        }
        IoEvent::Error { source, message } => eprintln!("[{source}] {message}"),
        IoEvent::AnalogInputValue { .. } | IoEvent::LaserInputValue { .. } => {}
    }
}
