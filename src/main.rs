//! # Telemetry Plotter
//!
//! Live charts for a serial power monitor streaming
//! `temperature-voltage-current-power` lines.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse CLI arguments and load configuration
//!    - Set up logging (to a file while the terminal UI owns the screen)
//!    - Create the output file when recording is enabled
//!
//! 2. **Main Loop**
//!    - Acquisition task scans ports, reads lines and fills the buffer
//!    - Recorder task appends every sample to the output file
//!    - Terminal UI redraws four charts every refresh interval
//!
//! 3. **Graceful Shutdown**
//!    - `q`/`Esc` in the UI (or Ctrl+C when headless)
//!    - Stop acquisition, drain the recorder, log totals
//!
//! # Examples
//!
//! ```bash
//! telemetry-plotter --output data/run.csv
//! telemetry-plotter --port /dev/ttyUSB0 --baud 115200 --headless
//! ```

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use telemetry_plotter::acquisition::Acquisition;
use telemetry_plotter::config::{Config, LoggingConfig};
use telemetry_plotter::recorder::{spawn_recorder, Recorder};
use telemetry_plotter::serial::TokioSerialProvider;
use telemetry_plotter::telemetry::{lock_buffer, SampleBuffer};
use telemetry_plotter::ui::{self, App};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "telemetry-plotter", version, about = "Live charts for serial temperature/voltage/current/power telemetry")]
struct Args {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device to use instead of scanning all ports
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Record samples to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Recording format: csv, xlsx or jsonl
    #[arg(long)]
    format: Option<String>,

    /// Log samples instead of drawing charts
    #[arg(long)]
    headless: bool,
}

/// Load the config file (if any), apply CLI overrides and validate
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(port) = &args.port {
        config.serial.port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(output) = &args.output {
        config.recorder.path = Some(output.clone());
    }
    if let Some(format) = &args.format {
        config.recorder.format = format.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Log filter from `RUST_LOG` style directives, `info` when none are given
fn log_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives.unwrap_or_default())
}

/// Set up tracing
///
/// The terminal UI owns stdout, so logs go to a file unless running headless.
fn init_logging(logging: &LoggingConfig, headless: bool) -> Result<Option<WorkerGuard>> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(directives.as_deref());

    if headless {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    }

    fs::create_dir_all(&logging.dir)
        .with_context(|| format!("Failed to create log directory {}", logging.dir))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(logging.file_name.as_str())
        .build(&logging.dir)
        .context("Failed to open log file")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    let _log_guard = init_logging(&config.logging, args.headless)?;

    info!("Telemetry Plotter v{} starting...", env!("CARGO_PKG_VERSION"));

    let buffer = SampleBuffer::shared(config.buffer.capacity);

    let (recorder_tx, recorder_task) = match &config.recorder.path {
        Some(path) => {
            let recorder = Recorder::create(path, config.record_format()?)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let (tx, task) = spawn_recorder(recorder);
            (Some(tx), Some(task))
        }
        None => {
            info!("No output file given, samples will not be recorded");
            (None, None)
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (mut acquisition, link_rx) = Acquisition::new(
        TokioSerialProvider,
        config.serial.clone(),
        buffer.clone(),
        recorder_tx,
        shutdown_rx,
    );
    if args.headless {
        acquisition = acquisition.with_sample_log_interval(config.logging.headless_log_every);
    }
    let acquisition_task = tokio::spawn(acquisition.run());

    if args.headless {
        drop(link_rx);
        info!("Running headless, press Ctrl+C to exit");
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down...");
    } else {
        let app = App::new(
            buffer.clone(),
            link_rx,
            config.recorder.path.clone(),
            Duration::from_millis(config.plot.refresh_interval_ms),
        );
        tokio::task::spawn_blocking(move || ui::run(app)).await??;
    }

    // Stopping acquisition drops the recorder's sender, which ends the recorder
    let _ = shutdown_tx.send(true);
    acquisition_task.await?;

    if let Some(task) = recorder_task {
        let rows = task.await?;
        info!("Recorded {} samples", rows);
    }

    info!("Total samples received: {}", lock_buffer(&buffer).total_received());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_plotter::recorder::RecordFormat;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("telemetry-plotter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_without_arguments() {
        let config = load_config(&parse(&[])).unwrap();
        assert_eq!(config.serial.port, None);
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.recorder.path, None);
    }

    #[test]
    fn test_cli_overrides() {
        let args = parse(&[
            "--port", "/dev/ttyUSB1",
            "--baud", "115200",
            "--output", "out/run.jsonl",
            "--format", "jsonl",
            "--headless",
        ]);
        assert!(args.headless);

        let config = load_config(&args).unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.recorder.path, Some(PathBuf::from("out/run.jsonl")));
        assert_eq!(config.record_format().unwrap(), RecordFormat::Jsonl);
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(load_config(&parse(&["--baud", "1234"])).is_err());
        assert!(load_config(&parse(&["--format", "xls"])).is_err());
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("")).to_string(), "info");
    }

    #[test]
    fn test_log_filter_honours_directives() {
        let filter = log_filter(Some("debug"));
        assert_eq!(filter.to_string(), "debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = log_filter(Some("telemetry_plotter=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_missing_config_file_rejected() {
        assert!(load_config(&parse(&["--config", "/nonexistent/plotter.toml"])).is_err());
    }
}
