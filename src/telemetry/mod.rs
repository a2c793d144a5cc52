//! # Telemetry Module
//!
//! Sample types, line parsing and the bounded sample buffer.
//!
//! This module handles:
//! - Splitting delimited device lines into four numeric fields
//! - Assigning the running time counter to accepted readings
//! - Keeping the last N samples for the charts
//! - Sharing the buffer between acquisition and rendering behind one lock

pub mod buffer;
pub mod parser;
pub mod sample;

pub use buffer::{lock_buffer, SampleBuffer, SharedBuffer, DEFAULT_CAPACITY};
pub use parser::{decode_line, parse_line, ParseError, DEFAULT_DELIMITER, FIELD_COUNT};
pub use sample::{Channel, Reading, Sample};
