/*!
# GCode Sender

Streams X/Y/Z positions parsed from a GCode file to stepper drivers over a
serial link. Every position is sent as one frame and must be acknowledged
with `0xAA` before the next one goes out. Type `s` (or press Ctrl+C) to stop.

## Usage

### Send a file
```bash
gsender send part.gcode --port /dev/ttyUSB0 --baudrate 115200
```

### Dry run against the built-in simulated controller
```bash
gsender send part.gcode --simulate
```

### Generate a configuration file
```bash
gsender config --output gsender.toml
```
*/

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod config;
mod send;

use config::AppConfig;
use send::{run_send, SendOptions};
use stepper_link::{RunOutcome, RunReport};

#[derive(Parser)]
#[command(name = "gsender")]
#[command(about = "Send GCode positions to stepper drivers over serial")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "gsender.toml", global = true)]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GCode file
    Send {
        /// Path to the GCode file
        gcode_file: PathBuf,

        /// Serial port name (e.g. COM3, /dev/ttyUSB0)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate for serial communication [default: 9600]
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        baudrate: Option<u32>,

        /// Re-send a frame this many times after an ACK timeout [default: 0]
        #[arg(long)]
        ack_retries: Option<u32>,

        /// Use the built-in simulated controller instead of a serial port
        #[arg(long)]
        simulate: bool,

        /// Do not prompt for 's' on the console (Ctrl+C still stops)
        #[arg(long)]
        no_prompt: bool,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Generate configuration file
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "gsender.toml")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs and the stop prompt go to stderr; stdout carries only the report
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Send { gcode_file, port, baudrate, ack_retries, simulate, no_prompt, json } => {
            let config = AppConfig::load_or_default(&cli.config)?;
            let options = SendOptions {
                port,
                baud_rate: baudrate,
                ack_retries,
                simulate,
                watch_console: !no_prompt,
                ..SendOptions::new(gcode_file)
            };

            let report = run_send(&config, &options)?;
            print_report(&report, json)?;

            Ok(if report.outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Config { output } => {
            generate_config_file(output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Tell the operator how the run ended
fn print_report(report: &RunReport, json: bool) -> io::Result<()> {
    // Finish the pending stop prompt line
    eprintln!();
    write_report(&mut io::stdout().lock(), report, json)
}

/// Write the run summary; in JSON mode this is exactly one JSON document per line
fn write_report<W: Write>(out: &mut W, report: &RunReport, json: bool) -> io::Result<()> {
    if json {
        writeln!(out, "{}", report.to_json())?;
        return out.flush();
    }

    match &report.outcome {
        RunOutcome::Completed => {
            writeln!(out, "✅ Completed: {} positions sent in {:.1}s",
                     report.frames_acknowledged, report.elapsed.as_secs_f64())?;
        }
        RunOutcome::Stopped { line } => {
            writeln!(out, "🛑 Operation stopped at line {} after {} positions",
                     line, report.frames_acknowledged)?;
        }
        RunOutcome::Failed { line, error } => {
            let at = line.map(|l| format!(" at line {}", l)).unwrap_or_default();
            eprintln!("❌ Failed{} ({}): {}", at, error.category(), error);
        }
    }
    out.flush()
}

/// Generate a default configuration file
fn generate_config_file(output_path: PathBuf) -> anyhow::Result<()> {
    let config = AppConfig::new();
    config.save_to_file(&output_path)?;

    println!("✅ Generated configuration file: {}", output_path.display());
    println!("📝 Set [serial].port, then run:");
    println!("   gsender --config {} send <gcode_file>", output_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_arguments() {
        let cli = Cli::parse_from([
            "gsender", "send", "part.gcode", "--port", "COM3", "--baudrate", "115200", "--json",
        ]);
        match cli.command {
            Commands::Send { gcode_file, port, baudrate, simulate, json, .. } => {
                assert_eq!(gcode_file, PathBuf::from("part.gcode"));
                assert_eq!(port.as_deref(), Some("COM3"));
                assert_eq!(baudrate, Some(115_200));
                assert!(!simulate);
                assert!(json);
            }
            Commands::Config { .. } => panic!("expected send"),
        }
        assert_eq!(cli.config, PathBuf::from("gsender.toml"));
    }

    #[test]
    fn test_zero_baudrate_rejected() {
        let result = Cli::try_parse_from(["gsender", "send", "a.gcode", "--baudrate", "0"]);
        assert!(result.is_err());
    }

    fn simulated_report(program: &str) -> RunReport {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.gcode");
        std::fs::write(&path, program).unwrap();

        let mut config = AppConfig::new();
        config.timing.pacing_ms = 1;
        config.simulator.ack_latency_ms = 1;
        let options = SendOptions {
            simulate: true,
            watch_console: false,
            handle_ctrlc: false,
            ..SendOptions::new(&path)
        };
        run_send(&config, &options).unwrap()
    }

    #[test]
    fn test_json_report_is_a_single_json_line() {
        let report = simulated_report("G1 X1 Y2 Z3\nG0 X-1.5 Y0 Z0\n");
        let mut out = Vec::new();
        write_report(&mut out, &report, true).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["state"], "completed");
        assert_eq!(value["frames_acknowledged"], 2);
    }

    #[test]
    fn test_text_report() {
        let report = simulated_report("G1 X1 Y2 Z3\n");
        let mut out = Vec::new();
        write_report(&mut out, &report, false).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("✅ Completed: 1 positions"));
    }

    #[test]
    fn test_generate_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gsender.toml");
        generate_config_file(path.clone()).unwrap();
        assert_eq!(AppConfig::load_from_file(&path).unwrap(), AppConfig::new());
    }
}
