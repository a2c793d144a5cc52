//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PlotterError, Result};
use crate::recorder::RecordFormat;
use crate::telemetry::{DEFAULT_CAPACITY, DEFAULT_DELIMITER};

/// Baud rates accepted by `serial.baud_rate`
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub buffer: BufferConfig,

    #[serde(default)]
    pub plot: PlotConfig,

    #[serde(default)]
    pub recorder: RecorderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Fixed device path; when unset every enumerated port is tried
    #[serde(default)]
    pub port: Option<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

/// Sample buffer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BufferConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// Chart rendering configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PlotConfig {
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

/// Sample recording configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RecorderConfig {
    /// Output file; recording is disabled when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_record_format")]
    pub format: String,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,

    #[serde(default = "default_log_file_name")]
    pub file_name: String,

    #[serde(default = "default_headless_log_every")]
    pub headless_log_every: u64,
}

// Default value functions
fn default_baud_rate() -> u32 { 9600 }
fn default_timeout_ms() -> u64 { 2000 }
fn default_reconnect_interval_ms() -> u64 { 2000 }
fn default_delimiter() -> char { DEFAULT_DELIMITER }

fn default_capacity() -> usize { DEFAULT_CAPACITY }

fn default_refresh_interval_ms() -> u64 { 100 }

fn default_record_format() -> String { "csv".to_string() }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_log_file_name() -> String { "telemetry-plotter.log".to_string() }
fn default_headless_log_every() -> u64 { 10 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            delimiter: default_delimiter(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: default_capacity() }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self { refresh_interval_ms: default_refresh_interval_ms() }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            path: None,
            format: default_record_format(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            file_name: default_log_file_name(),
            headless_log_every: default_headless_log_every(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> PlotterError {
    PlotterError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use telemetry_plotter::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Recording format parsed from `recorder.format`
    pub fn record_format(&self) -> Result<RecordFormat> {
        self.recorder.format.parse()
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if let Some(port) = &self.serial.port {
            if port.trim().is_empty() {
                return Err(invalid("serial port cannot be empty when set"));
            }
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                SUPPORTED_BAUD_RATES
            )));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        // The delimiter must not be confusable with part of a number
        let d = self.serial.delimiter;
        if d.is_whitespace() || d.is_ascii_digit() || matches!(d, '.' | 'e' | 'E' | '+') {
            return Err(invalid(format!("delimiter {:?} cannot separate numeric fields", d)));
        }

        if self.buffer.capacity < 2 || self.buffer.capacity > 100_000 {
            return Err(invalid("buffer capacity must be between 2 and 100000"));
        }

        if self.plot.refresh_interval_ms < 10 || self.plot.refresh_interval_ms > 10000 {
            return Err(invalid("refresh_interval_ms must be between 10 and 10000"));
        }

        if let Some(path) = &self.recorder.path {
            if path.as_os_str().is_empty() {
                return Err(invalid("recorder path cannot be empty when set"));
            }
        }
        self.record_format()?;

        if self.logging.dir.is_empty() {
            return Err(invalid("logging dir cannot be empty"));
        }

        if self.logging.file_name.is_empty() {
            return Err(invalid("logging file_name cannot be empty"));
        }

        if self.logging.headless_log_every == 0 {
            return Err(invalid("headless_log_every must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.serial.port, None);
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.timeout_ms, 2000);
        assert_eq!(config.serial.reconnect_interval_ms, 2000);
        assert_eq!(config.serial.delimiter, '-');
        assert_eq!(config.buffer.capacity, 100);
        assert_eq!(config.plot.refresh_interval_ms, 100);
        assert_eq!(config.recorder.path, None);
        assert_eq!(config.record_format().unwrap(), RecordFormat::Csv);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"
baud_rate = 115200
delimiter = ","

[buffer]
capacity = 250

[recorder]
path = "data/run.csv"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.delimiter, ',');
        assert_eq!(config.buffer.capacity, 250);
        assert_eq!(config.recorder.path, Some(PathBuf::from("data/run.csv")));
        // Untouched sections fall back to defaults
        assert_eq!(config.plot.refresh_interval_ms, 100);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/telemetry-plotter.toml");
        assert!(matches!(result, Err(PlotterError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[serial\nport = ").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(PlotterError::Config(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.serial.port = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsupported_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 12345;
        assert!(config.validate().is_err());

        config.serial.baud_rate = 115200;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_ms_bounds() {
        let mut config = Config::default();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());

        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());

        config.serial.timeout_ms = 10000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reconnect_interval_bounds() {
        let mut config = Config::default();
        config.serial.reconnect_interval_ms = 0;
        assert!(config.validate().is_err());

        config.serial.reconnect_interval_ms = 60001;
        assert!(config.validate().is_err());

        config.serial.reconnect_interval_ms = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_numeric_delimiters_rejected() {
        for delimiter in ['1', '.', 'e', 'E', '+', ' ', '\t'] {
            let mut config = Config::default();
            config.serial.delimiter = delimiter;
            assert!(config.validate().is_err(), "delimiter {:?} should be rejected", delimiter);
        }

        for delimiter in ['-', ',', ';', '|'] {
            let mut config = Config::default();
            config.serial.delimiter = delimiter;
            assert!(config.validate().is_ok(), "delimiter {:?} should be accepted", delimiter);
        }
    }

    #[test]
    fn test_buffer_capacity_bounds() {
        let mut config = Config::default();
        config.buffer.capacity = 1;
        assert!(config.validate().is_err());

        config.buffer.capacity = 100_001;
        assert!(config.validate().is_err());

        config.buffer.capacity = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_refresh_interval_bounds() {
        let mut config = Config::default();
        config.plot.refresh_interval_ms = 9;
        assert!(config.validate().is_err());

        config.plot.refresh_interval_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_record_format() {
        let mut config = Config::default();
        config.recorder.format = "jsonl".to_string();
        assert_eq!(config.record_format().unwrap(), RecordFormat::Jsonl);
        assert!(config.validate().is_ok());

        config.recorder.format = "xlsx".to_string();
        assert_eq!(config.record_format().unwrap(), RecordFormat::Xlsx);

        config.recorder.format = "parquet".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_recorder_path() {
        let mut config = Config::default();
        config.recorder.path = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir() {
        let mut config = Config::default();
        config.logging.dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_headless_log_every_zero() {
        let mut config = Config::default();
        config.logging.headless_log_every = 0;
        assert!(config.validate().is_err());
    }
}
