//! # Error Types
//!
//! Custom error types for Telemetry Plotter using `thiserror`.

use thiserror::Error;

use crate::telemetry::parser::ParseError;

/// Main error type for Telemetry Plotter
#[derive(Debug, Error)]
pub enum PlotterError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors (open, enumerate, read)
    #[error("Serial error: {0}")]
    Serial(String),

    /// No serial port could be opened
    #[error("No serial device could be opened (tried: {0})")]
    SerialPortNotFound(String),

    /// Malformed telemetry line
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// CSV recording errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Excel workbook recording errors
    #[error("Workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// JSON Lines recording errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Telemetry Plotter
pub type Result<T> = std::result::Result<T, PlotterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_converts() {
        let err: PlotterError = ParseError::FieldCount { expected: 4, got: 3 }.into();
        assert_eq!(
            err.to_string(),
            "Parse error: incorrect number of parts: expected 4, got 3"
        );
    }

    #[test]
    fn test_port_not_found_message() {
        let err = PlotterError::SerialPortNotFound("/dev/ttyUSB0, /dev/ttyUSB1".to_string());
        assert!(err.to_string().contains("/dev/ttyUSB0, /dev/ttyUSB1"));
    }
}
