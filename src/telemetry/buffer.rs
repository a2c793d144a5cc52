//! # Sample Buffer
//!
//! Fixed-capacity ring of the most recent samples.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;

use super::sample::{Channel, Reading, Sample};

/// Number of samples kept for plotting
pub const DEFAULT_CAPACITY: usize = 100;

/// Buffer shared between the acquisition task and the renderer
pub type SharedBuffer = Arc<Mutex<SampleBuffer>>;

/// Lock the shared buffer, recovering the data if a holder panicked
pub fn lock_buffer(buffer: &SharedBuffer) -> MutexGuard<'_, SampleBuffer> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Bounded ring of recent samples
///
/// Whole samples are stored together, so every channel series has the
/// same length and shares the same time axis.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    next_time: u64,
}

impl SampleBuffer {
    /// Create an empty buffer
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            next_time: 0,
        }
    }

    /// Wrap a new buffer for sharing
    pub fn shared(capacity: usize) -> SharedBuffer {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    /// Append a reading, evicting the oldest sample when full
    ///
    /// # Returns
    ///
    /// * `Sample` - The stored sample with its assigned time counter
    pub fn push(&mut self, reading: Reading) -> Sample {
        let sample = Sample {
            time: self.next_time,
            timestamp: Local::now(),
            reading,
        };
        self.next_time += 1;

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample.clone());

        sample
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples accepted since start (including evicted ones)
    pub fn total_received(&self) -> u64 {
        self.next_time
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// (time, value) points for one channel, oldest first
    pub fn series(&self, channel: Channel) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .map(|s| (s.time as f64, s.reading.value(channel)))
            .collect()
    }

    /// X axis range covering the buffered samples
    ///
    /// A single sample gets a one-unit wide range so the axis is never empty.
    pub fn time_bounds(&self) -> Option<[f64; 2]> {
        let first = self.samples.front()?.time as f64;
        let last = self.samples.back()?.time as f64;

        if last > first {
            Some([first, last])
        } else {
            Some([first, first + 1.0])
        }
    }

    /// Y axis range for one channel: `[min - padding, max + padding]`
    pub fn value_bounds(&self, channel: Channel) -> Option<[f64; 2]> {
        let mut values = self.samples.iter().map(|s| s.reading.value(channel));
        let first = values.next()?;
        let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

        let padding = channel.axis_padding();
        Some([min - padding, max + padding])
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
