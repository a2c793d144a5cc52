//! # Telemetry Plotter Library
//!
//! Live charts for a serial-connected power monitor.
//!
//! The device streams lines such as `25.4-12.1-1.5-18.2` (temperature,
//! voltage, current, power). This library parses them, keeps the most recent
//! samples in a bounded buffer, draws four terminal charts and optionally
//! records every sample to a CSV or JSON Lines file.

pub mod acquisition;
pub mod config;
pub mod error;
pub mod recorder;
pub mod serial;
pub mod telemetry;
pub mod ui;
