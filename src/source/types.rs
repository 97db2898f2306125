//! Raw sample types produced at the acquisition boundary.
//!
//! A sample is one reading of every armband electrode. Samples are immutable
//! once captured; the core only ever compares, copies, and reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of EMG electrodes on the armband.
pub const CHANNEL_COUNT: usize = 8;

/// One 8-channel EMG reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sample {
    /// Timestamp when the reading was captured
    pub timestamp: DateTime<Utc>,
    /// Raw signed reading per electrode, channel 0 first
    pub channels: [i32; CHANNEL_COUNT],
}

impl Sample {
    /// Create a sample captured now.
    pub fn new(channels: [i32; CHANNEL_COUNT]) -> Self {
        Self {
            timestamp: Utc::now(),
            channels,
        }
    }

    /// Create a sample with an explicit capture time.
    pub fn at(timestamp: DateTime<Utc>, channels: [i32; CHANNEL_COUNT]) -> Self {
        Self {
            timestamp,
            channels,
        }
    }

    /// Build a sample from a driver read.
    ///
    /// Returns `None` unless the read carries exactly one value per channel.
    pub fn from_slice(values: &[i32]) -> Option<Self> {
        let channels: [i32; CHANNEL_COUNT] = values.try_into().ok()?;
        Some(Self::new(channels))
    }

    /// Whether two samples carry identical raw readings, ignoring capture time.
    pub fn same_reading(&self, other: &Sample) -> bool {
        self.channels == other.channels
    }

    /// Value of a single channel.
    pub fn channel(&self, index: usize) -> i32 {
        self.channels[index]
    }
}
