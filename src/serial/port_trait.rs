//! Trait abstraction for serial port discovery and opening to enable testing

use std::time::Duration;

use tokio::io::AsyncRead;
use tokio_serial::SerialPortBuilderExt;

use crate::error::{PlotterError, Result};

/// Readable byte stream of an opened port
pub type PortStream = Box<dyn AsyncRead + Send + Unpin>;

/// Source of serial ports
#[cfg_attr(test, mockall::automock)]
pub trait PortProvider: Send + Sync {
    /// Names of the ports currently present on the system
    fn available_ports(&self) -> Result<Vec<String>>;

    /// Open a port for reading (8N1, no flow control)
    fn open(&self, path: &str, baud_rate: u32, timeout: Duration) -> Result<PortStream>;
}

/// Real ports via `tokio-serial`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSerialProvider;

impl PortProvider for TokioSerialProvider {
    fn available_ports(&self) -> Result<Vec<String>> {
        let ports = tokio_serial::available_ports()
            .map_err(|e| PlotterError::Serial(format!("Failed to enumerate serial ports: {}", e)))?;

        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn open(&self, path: &str, baud_rate: u32, timeout: Duration) -> Result<PortStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(timeout)
            .open_native_async()
            .map_err(|e| PlotterError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(Box::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_invalid_path_returns_error() {
        let result = TokioSerialProvider.open(
            "/dev/nonexistent_serial_device_12345",
            9600,
            Duration::from_millis(100),
        );

        match result {
            Err(PlotterError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            Err(other) => panic!("Expected Serial error, got: {:?}", other),
            Ok(_) => panic!("Expected opening a missing device to fail"),
        }
    }

    // Only meaningful with a device attached
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_enumerate_real_ports() {
        match TokioSerialProvider.available_ports() {
            Ok(ports) => println!("Available ports: {:?}", ports),
            Err(e) => println!("Enumeration failed (OK without hardware): {}", e),
        }
    }
}
