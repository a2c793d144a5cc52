//! # Serial Communication Module
//!
//! Finds and opens the telemetry device.
//!
//! This module handles:
//! - Enumerating serial ports (or using a fixed one from config)
//! - Opening the first port that accepts the configured baud rate
//! - Handing the byte stream to the acquisition loop

pub mod port_trait;

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{PlotterError, Result};
pub use port_trait::{PortProvider, PortStream, TokioSerialProvider};

/// Baud rate of the telemetry firmware
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// An opened connection to the telemetry device
pub struct SerialLink {
    /// Readable port stream
    stream: PortStream,
    /// Device path (e.g., /dev/ttyUSB0 or COM3)
    device_path: String,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialLink {
    /// Make one pass over the candidate ports and open the first that works
    ///
    /// When `config.port` is set only that device is tried, otherwise every
    /// enumerated port is tried in order.
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if no candidate could be opened, or
    /// `Serial` if the ports could not be enumerated.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use telemetry_plotter::config::SerialConfig;
    /// use telemetry_plotter::serial::{SerialLink, TokioSerialProvider};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let link = SerialLink::connect(&TokioSerialProvider, &SerialConfig::default())?;
    ///     println!("Connected to {}", link.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn connect<P: PortProvider + ?Sized>(provider: &P, config: &SerialConfig) -> Result<Self> {
        let candidates = match &config.port {
            Some(port) => vec![port.clone()],
            None => provider.available_ports()?,
        };

        let timeout = Duration::from_millis(config.timeout_ms);

        for path in &candidates {
            debug!("Trying to open serial port: {}", path);

            match provider.open(path, config.baud_rate, timeout) {
                Ok(stream) => {
                    info!("Connected to {} at {} baud", path, config.baud_rate);
                    return Ok(Self {
                        stream,
                        device_path: path.clone(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        let tried = if candidates.is_empty() {
            "no ports available".to_string()
        } else {
            candidates.join(", ")
        };
        Err(PlotterError::SerialPortNotFound(tried))
    }

    /// Device path of the opened port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Take the underlying byte stream
    pub fn into_stream(self) -> PortStream {
        self.stream
    }
}
