//! Simulated armband sources for demos and tests.

use crate::core::decision::GestureLabel;
use crate::source::channel::RawFrame;
use crate::source::types::{Sample, CHANNEL_COUNT};
use crate::source::SampleSource;

/// Per-channel amplitude envelope while resting.
const RESTING_PROFILE: [f64; CHANNEL_COUNT] = [3.0, 3.0, 2.0, 3.0, 2.0, 3.0, 3.0, 2.0];

/// Per-channel amplitude envelope for a full-hand grasp.
const GRASP_PROFILE: [f64; CHANNEL_COUNT] = [60.0, 55.0, 50.0, 45.0, 45.0, 50.0, 55.0, 60.0];

/// Per-channel amplitude envelope for a thumb/index pinch.
const PINCH_PROFILE: [f64; CHANNEL_COUNT] = [8.0, 10.0, 45.0, 60.0, 55.0, 12.0, 8.0, 6.0];

/// Deterministic simulated armband.
///
/// Cycles through a gesture script, holding each gesture for a fixed number
/// of readings. Every reading is fresh, so the stream never stalls.
#[derive(Debug, Clone)]
pub struct SyntheticArmband {
    script: Vec<GestureLabel>,
    samples_per_gesture: usize,
    position: usize,
    state: u64,
}

impl SyntheticArmband {
    /// Create an armband playing `script` with the given noise seed.
    pub fn new(script: Vec<GestureLabel>, samples_per_gesture: usize, seed: u64) -> Self {
        Self {
            script,
            samples_per_gesture: samples_per_gesture.max(1),
            position: 0,
            // xorshift must not start at zero
            state: seed.max(1),
        }
    }

    /// The gesture the next reading will simulate.
    pub fn current_gesture(&self) -> GestureLabel {
        if self.script.is_empty() {
            return GestureLabel::Resting;
        }
        let segment = (self.position / self.samples_per_gesture) % self.script.len();
        self.script[segment]
    }

    /// Produce the next raw reading.
    pub fn next_reading(&mut self) -> [i32; CHANNEL_COUNT] {
        let profile = match self.current_gesture() {
            GestureLabel::Grasp => &GRASP_PROFILE,
            GestureLabel::Pinch => &PINCH_PROFILE,
            GestureLabel::Resting => &RESTING_PROFILE,
        };

        let mut reading = [0; CHANNEL_COUNT];
        for (value, amplitude) in reading.iter_mut().zip(profile.iter()) {
            let noise = self.next_unit();
            *value = (amplitude * noise).round().clamp(-128.0, 127.0) as i32;
        }

        self.position += 1;
        reading
    }

    /// Produce the next reading as a driver frame.
    pub fn next_frame(&mut self) -> RawFrame {
        self.next_reading().to_vec()
    }

    /// Uniform value in [-1, 1].
    fn next_unit(&mut self) -> f64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        (self.state >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
    }
}

impl SampleSource for SyntheticArmband {
    fn latest_sample(&mut self) -> Option<Sample> {
        Some(Sample::new(self.next_reading()))
    }
}

/// Replays a fixed list of driver frames, one per request.
///
/// Once exhausted it keeps returning the final frame, like a sensor whose
/// feed has stalled.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    frames: Vec<RawFrame>,
    next: usize,
}

impl ReplaySource {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        Self { frames, next: 0 }
    }

    /// Build from complete readings.
    pub fn from_readings(readings: &[[i32; CHANNEL_COUNT]]) -> Self {
        Self::new(readings.iter().map(|r| r.to_vec()).collect())
    }

    /// Number of frames not yet replayed.
    pub fn remaining(&self) -> usize {
        self.frames.len().saturating_sub(self.next)
    }
}

impl SampleSource for ReplaySource {
    fn latest_sample(&mut self) -> Option<Sample> {
        let index = self.next.min(self.frames.len().checked_sub(1)?);
        if self.next < self.frames.len() {
            self.next += 1;
        }
        Sample::from_slice(&self.frames[index])
    }
}
