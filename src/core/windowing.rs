//! Fixed-size sample windows with 50% overlap.
//!
//! Samples accumulate in a [`WindowBuffer`] until it holds [`WINDOW_SIZE`]
//! readings. The full window is handed to feature extraction, after which the
//! oldest half is evicted so consecutive windows share [`HOP_SIZE`] samples.
//! Consecutive identical readings (a stalled sensor feed) are accepted once.

use crate::source::types::{Sample, CHANNEL_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Samples per classification window (~250 ms at the armband's 70 Hz).
pub const WINDOW_SIZE: usize = 18;

/// Samples evicted after each classification.
pub const HOP_SIZE: usize = WINDOW_SIZE / 2;

/// A full window of samples, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Window {
    samples: Vec<Sample>,
}

impl Window {
    /// Build a window from raw readings, oldest first.
    pub fn from_readings(readings: &[[i32; CHANNEL_COUNT]]) -> Self {
        Self {
            samples: readings.iter().map(|r| Sample::new(*r)).collect(),
        }
    }

    /// Number of samples in the window.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The samples, oldest first.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The time series of one channel as floats.
    pub fn channel(&self, index: usize) -> Vec<f64> {
        self.samples
            .iter()
            .map(|s| f64::from(s.channel(index)))
            .collect()
    }
}

/// Result of offering a sample to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Identical to the previous accepted reading; not stored.
    Duplicate,
    /// Stored. `ready` is true when the buffer is now full.
    Accepted { ready: bool },
}

impl Observation {
    /// Whether the buffer is full after this observation.
    pub fn is_ready(&self) -> bool {
        matches!(self, Observation::Accepted { ready: true })
    }
}

/// Bounded FIFO of raw samples feeding the classifier.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    /// Last accepted reading, kept across evictions for deduplication
    last_accepted: Option<Sample>,
}

impl WindowBuffer {
    /// Create a buffer holding [`WINDOW_SIZE`] samples.
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_SIZE)
    }

    /// Create a buffer with a custom capacity (at least 2).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
            last_accepted: None,
        }
    }

    /// Offer a sample.
    ///
    /// The sample is dropped if its reading equals the previously accepted
    /// one. If the caller never drained a full buffer, the oldest sample is
    /// evicted to stay within capacity.
    pub fn observe(&mut self, sample: Sample) -> Observation {
        if let Some(ref last) = self.last_accepted {
            if last.same_reading(&sample) {
                return Observation::Duplicate;
            }
        }

        self.samples.push_back(sample);
        self.last_accepted = Some(sample);

        while self.samples.len() > self.capacity {
            tracing::warn!(
                capacity = self.capacity,
                "window overflow; evicting oldest sample"
            );
            self.samples.pop_front();
        }

        Observation::Accepted {
            ready: self.is_ready(),
        }
    }

    /// Whether the buffer holds a full window.
    pub fn is_ready(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Copy out the current window if it is full.
    pub fn window(&self) -> Option<Window> {
        if !self.is_ready() {
            return None;
        }
        Some(Window {
            samples: self.samples.iter().copied().collect(),
        })
    }

    /// Evict the oldest half of the window. Returns the number evicted.
    pub fn drain_half(&mut self) -> usize {
        let count = self.hop().min(self.samples.len());
        self.samples.drain(..count);
        count
    }

    /// Samples evicted per drain.
    pub fn hop(&self) -> usize {
        self.capacity / 2
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate the buffered samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}

impl Default for WindowBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: i32) -> Sample {
        Sample::new([value; CHANNEL_COUNT])
    }

    #[test]
    fn test_fills_after_window_size_distinct_samples() {
        let mut buffer = WindowBuffer::new();

        for i in 0..(WINDOW_SIZE as i32 - 1) {
            assert_eq!(
                buffer.observe(sample(i)),
                Observation::Accepted { ready: false }
            );
        }
        assert!(!buffer.is_ready());
        assert!(buffer.window().is_none());

        assert!(buffer.observe(sample(100)).is_ready());
        assert!(buffer.is_ready());
        assert_eq!(buffer.window().unwrap().len(), WINDOW_SIZE);
    }

    #[test]
    fn test_drain_half_keeps_newest_in_order() {
        let mut buffer = WindowBuffer::new();
        for i in 0..WINDOW_SIZE as i32 {
            buffer.observe(sample(i));
        }

        assert_eq!(buffer.drain_half(), HOP_SIZE);
        assert_eq!(buffer.len(), WINDOW_SIZE - HOP_SIZE);

        let remaining: Vec<i32> = buffer.iter().map(|s| s.channel(0)).collect();
        let expected: Vec<i32> = (HOP_SIZE as i32..WINDOW_SIZE as i32).collect();
        assert_eq!(remaining, expected);
    }

    #[test]
    fn test_repeated_sample_stored_once() {
        let mut buffer = WindowBuffer::new();

        assert!(matches!(
            buffer.observe(sample(5)),
            Observation::Accepted { .. }
        ));
        for _ in 0..10 {
            assert_eq!(buffer.observe(sample(5)), Observation::Duplicate);
        }
        assert_eq!(buffer.len(), 1);

        // A different reading, then the old one again, is not a duplicate
        buffer.observe(sample(6));
        buffer.observe(sample(5));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_dedup_survives_drain() {
        let mut buffer = WindowBuffer::new();
        for i in 0..WINDOW_SIZE as i32 {
            buffer.observe(sample(i));
        }
        buffer.drain_half();

        let last = WINDOW_SIZE as i32 - 1;
        assert_eq!(buffer.observe(sample(last)), Observation::Duplicate);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut buffer = WindowBuffer::with_capacity(4);
        for i in 0..6 {
            buffer.observe(sample(i));
        }

        assert_eq!(buffer.len(), 4);
        let values: Vec<i32> = buffer.iter().map(|s| s.channel(0)).collect();
        assert_eq!(values, vec![2, 3, 4, 5]);
        assert!(buffer.is_ready());
    }

    #[test]
    fn test_window_channel_extraction() {
        let mut readings = [[0; CHANNEL_COUNT]; 3];
        readings[0][2] = 1;
        readings[1][2] = -4;
        readings[2][2] = 9;

        let window = Window::from_readings(&readings);
        assert_eq!(window.channel(2), vec![1.0, -4.0, 9.0]);
        assert_eq!(window.channel(0), vec![0.0, 0.0, 0.0]);
    }
}
