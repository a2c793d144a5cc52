//! # Line Parser
//!
//! Parses device lines of the form `temperature-voltage-current-power`.

use thiserror::Error;

use super::sample::Reading;

/// Default field separator used by the device firmware
pub const DEFAULT_DELIMITER: char = '-';

/// Number of fields on every valid line
pub const FIELD_COUNT: usize = 4;

/// Reasons a line is discarded
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("incorrect number of parts: expected {expected}, got {got}")]
    FieldCount { expected: usize, got: usize },

    #[error("field {index} is not a number: {value:?}")]
    InvalidNumber { index: usize, value: String },

    #[error("field {index} is not finite")]
    NonFinite { index: usize },
}

/// Decode raw serial bytes into text, dropping anything that is not valid UTF-8
///
/// Line terminators and stray NUL bytes are removed from both ends.
pub fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

/// Parse one device line into a [`Reading`]
///
/// # Arguments
///
/// * `line` - Decoded line (terminator may still be attached)
/// * `delimiter` - Field separator
///
/// # Errors
///
/// Returns error if the line is empty, does not split into exactly
/// four fields, or any field is not a finite number.
///
/// # Examples
///
/// ```
/// use telemetry_plotter::telemetry::parser::parse_line;
///
/// let reading = parse_line("25.5-12.0-1.5-18.0\r\n", '-').unwrap();
/// assert_eq!(reading.voltage, 12.0);
/// ```
pub fn parse_line(line: &str, delimiter: char) -> Result<Reading, ParseError> {
    let line = line.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let parts: Vec<&str> = line.split(delimiter).collect();
    if parts.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount {
            expected: FIELD_COUNT,
            got: parts.len(),
        });
    }

    let mut values = [0.0f64; FIELD_COUNT];
    for (index, part) in parts.iter().enumerate() {
        let part = part.trim();
        let value: f64 = part.parse().map_err(|_| ParseError::InvalidNumber {
            index,
            value: part.to_string(),
        })?;

        if !value.is_finite() {
            return Err(ParseError::NonFinite { index });
        }
        values[index] = value;
    }

    Ok(Reading {
        temperature: values[0],
        voltage: values[1],
        current: values[2],
        power: values[3],
    })
}
