//! # Sample Types
//!
//! One reading per device line, and the four channels it carries.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Measured quantity shown on one chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    Voltage,
    Current,
    Power,
}

impl Channel {
    /// All channels in wire order (and chart order: left-to-right, top-to-bottom)
    pub const ALL: [Channel; 4] = [
        Channel::Temperature,
        Channel::Voltage,
        Channel::Current,
        Channel::Power,
    ];

    /// Series label, also used as the Y axis title and CSV column header
    pub fn label(self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature (°C)",
            Channel::Voltage => "Voltage (V)",
            Channel::Current => "Current (A)",
            Channel::Power => "Power (W)",
        }
    }

    /// Chart title
    pub fn title(self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature Over Time",
            Channel::Voltage => "Voltage Over Time",
            Channel::Current => "Current Over Time",
            Channel::Power => "Power Over Time",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Channel::Temperature => "°C",
            Channel::Voltage => "V",
            Channel::Current => "A",
            Channel::Power => "W",
        }
    }

    /// Margin added above the maximum and below the minimum on the Y axis
    ///
    /// Current readings are small (a few amps), so they get a tighter margin.
    pub fn axis_padding(self) -> f64 {
        match self {
            Channel::Current => 1.0,
            _ => 10.0,
        }
    }
}

/// The four values carried by one device line
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub temperature: f64,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

impl Reading {
    /// Value for a given channel
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Voltage => self.voltage,
            Channel::Current => self.current,
            Channel::Power => self.power,
        }
    }
}

/// A reading stamped with its position in the stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Sample counter, starting at 0 (plotted as seconds)
    pub time: u64,

    /// Wall-clock time the line was accepted
    pub timestamp: DateTime<Local>,

    #[serde(flatten)]
    pub reading: Reading,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> Reading {
        Reading {
            temperature: 25.5,
            voltage: 12.0,
            current: 1.5,
            power: 18.0,
        }
    }

    #[test]
    fn test_channel_order() {
        assert_eq!(Channel::ALL[0], Channel::Temperature);
        assert_eq!(Channel::ALL[1], Channel::Voltage);
        assert_eq!(Channel::ALL[2], Channel::Current);
        assert_eq!(Channel::ALL[3], Channel::Power);
    }

    #[test]
    fn test_reading_value_by_channel() {
        let r = reading();
        assert_eq!(r.value(Channel::Temperature), 25.5);
        assert_eq!(r.value(Channel::Voltage), 12.0);
        assert_eq!(r.value(Channel::Current), 1.5);
        assert_eq!(r.value(Channel::Power), 18.0);
    }

    #[test]
    fn test_axis_padding() {
        assert_eq!(Channel::Temperature.axis_padding(), 10.0);
        assert_eq!(Channel::Voltage.axis_padding(), 10.0);
        assert_eq!(Channel::Current.axis_padding(), 1.0);
        assert_eq!(Channel::Power.axis_padding(), 10.0);
    }

    #[test]
    fn test_labels_carry_units() {
        for channel in Channel::ALL {
            assert!(channel.label().contains(channel.unit()));
            assert!(channel.title().ends_with("Over Time"));
        }
    }

    #[test]
    fn test_sample_serializes_flat() {
        let sample = Sample {
            time: 7,
            timestamp: Local::now(),
            reading: reading(),
        };

        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["time"], 7);
        assert_eq!(value["temperature"], 25.5);
        assert_eq!(value["power"], 18.0);
        assert!(value["timestamp"].is_string());
        assert!(value.get("reading").is_none());
    }
}
