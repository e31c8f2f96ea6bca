/*!
Send job wiring.

Resolves the effective configuration, opens the GCode file and the
transport, starts the operator stop sources and runs the dispatcher:

1. Stop watcher thread: console prompt -> abort flag
2. Ctrl+C handler: -> the same abort flag
3. Dispatch loop on the calling thread: file lines -> frames -> ACKs
4. With `--simulate`, a controller thread on the far end of a channel
*/

use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use stepper_link::{
    channel_pair, spawn_stop_watcher, AbortFlag, ConsoleStopSource, Dispatcher, RunReport,
    SerialConfig, SerialTransport, SimulatedController, TimingSettings, Transport,
};
use tracing::{info, warn};

/// Everything the `send` subcommand needs beyond the config file
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub gcode_file: PathBuf,
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub ack_retries: Option<u32>,
    pub simulate: bool,
    pub watch_console: bool,
    pub handle_ctrlc: bool,
}

impl SendOptions {
    pub fn new(gcode_file: impl Into<PathBuf>) -> Self {
        Self {
            gcode_file: gcode_file.into(),
            port: None,
            baud_rate: None,
            ack_retries: None,
            simulate: false,
            watch_console: true,
            handle_ctrlc: true,
        }
    }
}

/// Effective serial and timing settings after command-line overrides
pub fn resolve(config: &AppConfig, options: &SendOptions) -> Result<(SerialConfig, TimingSettings)> {
    let mut serial = config.serial.clone();
    if let Some(port) = &options.port {
        serial.port = port.clone();
    }
    if let Some(baud_rate) = options.baud_rate {
        serial.baud_rate = baud_rate;
    }

    let mut timing = config.timing.clone();
    if let Some(retries) = options.ack_retries {
        timing.ack_retries = retries;
    }

    timing.validate()?;
    if !options.simulate {
        serial.validate()?;
    }

    Ok((serial, timing))
}

/// Run one send job to completion
pub fn run_send(config: &AppConfig, options: &SendOptions) -> Result<RunReport> {
    let (serial, timing) = resolve(config, options)?;

    let file = File::open(&options.gcode_file)
        .with_context(|| format!("Failed to open GCode file: {}", options.gcode_file.display()))?;
    let lines = BufReader::new(file).lines();
    info!("📄 Sending {}", options.gcode_file.display());

    let abort = AbortFlag::new();
    if options.handle_ctrlc {
        let flag = abort.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            if flag.trigger() {
                warn!("🛑 Received Ctrl+C, stopping after the current command");
            }
        }) {
            warn!("Could not install Ctrl+C handler: {}", e);
        }
    }
    if options.watch_console {
        // Blocks on stdin for the life of the process; never joined
        spawn_stop_watcher(ConsoleStopSource::stdio(), abort.clone())
            .context("Failed to start the stop watcher")?;
    }

    if options.simulate {
        info!("🧪 Simulation mode: no serial port is opened");
        let (transport, end) = channel_pair();
        let controller = SimulatedController::spawn(end, config.simulator.settings())
            .context("Failed to start the simulated controller")?;
        let report = dispatch(transport, timing, abort, lines);
        let accepted = controller.join();
        info!("🧪 Simulated controller accepted {} frames", accepted);
        Ok(report)
    } else {
        let transport = SerialTransport::open(&serial)?;
        Ok(dispatch(transport, timing, abort, lines))
    }
}

fn dispatch<T, I>(transport: T, timing: TimingSettings, abort: AbortFlag, lines: I) -> RunReport
where
    T: Transport,
    I: IntoIterator<Item = std::io::Result<String>>,
{
    Dispatcher::new(transport, timing, abort).run(lines)
}
