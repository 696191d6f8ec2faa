//! Line commands read from stdin

use daq_hub::{ChannelHandle, IoCoordinator, Persistence, Subsystem};
use tracing::info;

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Discover,
    Start(Subsystem),
    Stop(Subsystem),
    MapOutput(ChannelHandle, String),
    MapInput(ChannelHandle, String),
    MapDigital {
        handle: ChannelHandle,
        line: String,
        inverted: bool,
    },
    SetVoltage(ChannelHandle, f64),
    SetDigital(ChannelHandle, bool),
    SetLaser(f64),
    Limits(f64, f64),
    Samples(usize),
    Average(bool),
    AutoDiscover(bool),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  discover                          scan for devices
  start|stop <ao|ai|do|laser-ai|laser-ao>
  map-ao <handle> [channel]         map or unmap an analog output
  map-ai <handle> [channel]         map or unmap an analog input
  map-do <handle> [line] [inverted] map or unmap a digital line
  set <handle> <volts>              analog output setpoint
  do <handle> <on|off>              digital line state
  laser <volts>                     laser setpoint
  limits <min> <max>                output voltage limits
  samples <n>                       averaging window
  average <on|off>                  publish means instead of raw values
  auto-discover <on|off>
  status
  quit";

fn subsystem(word: &str) -> Result<Subsystem, String> {
    match word {
        "ao" => Ok(Subsystem::AnalogOutput),
        "ai" => Ok(Subsystem::AnalogInput),
        "do" => Ok(Subsystem::DigitalOutput),
        "laser-ai" => Ok(Subsystem::LaserInput),
        "laser-ao" => Ok(Subsystem::LaserOutput),
        other => Err(format!("unknown subsystem '{other}'")),
    }
}

fn switch(word: &str) -> Result<bool, String> {
    match word {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("expected on/off, got '{other}'")),
    }
}

fn number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T, String> {
    let word = word.ok_or_else(|| format!("missing {what}"))?;
    word.parse().map_err(|_| format!("invalid {what} '{word}'"))
}

fn handle(word: Option<&str>) -> Result<ChannelHandle, String> {
    number(word, "handle").map(ChannelHandle)
}

impl Command {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or("empty command")?;

        let command = match verb {
            "discover" => Command::Discover,
            "start" => Command::Start(subsystem(words.next().ok_or("missing subsystem")?)?),
            "stop" => Command::Stop(subsystem(words.next().ok_or("missing subsystem")?)?),
            "map-ao" => {
                let h = handle(words.next())?;
                Command::MapOutput(h, words.next().unwrap_or_default().to_string())
            }
            "map-ai" => {
                let h = handle(words.next())?;
                Command::MapInput(h, words.next().unwrap_or_default().to_string())
            }
            "map-do" => {
                let h = handle(words.next())?;
                let line = words.next().unwrap_or_default().to_string();
                let inverted = words.next() == Some("inverted");
                Command::MapDigital {
                    handle: h,
                    line,
                    inverted,
                }
            }
            "set" => {
                let h = handle(words.next())?;
                Command::SetVoltage(h, number(words.next(), "voltage")?)
            }
            "do" => {
                let h = handle(words.next())?;
                Command::SetDigital(h, switch(words.next().ok_or("missing state")?)?)
            }
            "laser" => Command::SetLaser(number(words.next(), "voltage")?),
            "limits" => Command::Limits(
                number(words.next(), "minimum")?,
                number(words.next(), "maximum")?,
            ),
            "samples" => Command::Samples(number(words.next(), "sample count")?),
            "average" => Command::Average(switch(words.next().ok_or("missing state")?)?),
            "auto-discover" => {
                Command::AutoDiscover(switch(words.next().ok_or("missing state")?)?)
            }
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command '{other}'")),
        };
        Ok(command)
    }

    /// Apply to the coordinator; returns false on quit
    pub fn apply(self, hub: &mut IoCoordinator) -> anyhow::Result<bool> {
        match self {
            Command::Discover => hub.discover()?,
            Command::Start(s) => hub.start_subsystem(s)?,
            Command::Stop(s) => hub.stop_subsystem(s),
            Command::MapOutput(h, name) => hub.set_output_channel(h, &name, Persistence::Persist)?,
            Command::MapInput(h, name) => hub.set_input_channel(h, &name, Persistence::Persist)?,
            Command::MapDigital {
                handle,
                line,
                inverted,
            } => hub.set_digital_output_channel(handle, &line, inverted, Persistence::Persist)?,
            Command::SetVoltage(h, v) => {
                if let Some(stored) = hub.set_output_voltage(h, v) {
                    println!("{h} <- {stored} V");
                }
            }
            Command::SetDigital(h, on) => {
                hub.set_digital_output_enabled(h, on);
            }
            Command::SetLaser(v) => println!("laser <- {} V", hub.set_laser_voltage(v)),
            Command::Limits(min, max) => hub.set_voltage_limits(min, max)?,
            Command::Samples(n) => hub.set_sample_count(n)?,
            Command::Average(on) => hub.set_use_average(on),
            Command::AutoDiscover(on) => hub.set_auto_discover(on),
            Command::Status => print_status(hub),
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }
}

fn print_status(hub: &IoCoordinator) {
    let limits = hub.voltage_limits();
    println!(
        "limits [{}, {}] V, {} sample(s), average {}, auto-discover {}",
        limits.min(),
        limits.max(),
        hub.sample_count(),
        hub.use_average(),
        hub.auto_discover()
    );
    for subsystem in Subsystem::IO {
        println!(
            "  {:<15} {}",
            subsystem.name(),
            if hub.is_enabled(subsystem) { "on" } else { "off" }
        );
    }
    for h in hub.output_handles() {
        println!(
            "  ao {h} {} = {} V",
            hub.output_channel(h).unwrap_or_default(),
            hub.output_voltage(h).unwrap_or_default()
        );
    }
    for h in hub.input_handles() {
        println!(
            "  ai {h} {} = {} (mean {})",
            hub.input_channel(h).unwrap_or_default(),
            hub.analog_input_value(h),
            hub.analog_input_average(h)
        );
    }
    for h in hub.digital_output_handles() {
        println!(
            "  do {h} {}{} = {}",
            hub.digital_output_channel(h).unwrap_or_default(),
            if hub.digital_output_inverted(h) { " (inverted)" } else { "" },
            if hub.digital_output_enabled(h) { "on" } else { "off" }
        );
    }
    println!(
        "  laser out {} V, in {} (mean {})",
        hub.laser_output_voltage(),
        hub.laser_input_value(),
        hub.laser_input_average()
    );
    info!("{} device(s) known", hub.devices().len());
}
