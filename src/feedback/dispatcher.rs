//! Feedback dispatcher implementations.

use crate::core::decision::GestureLabel;
use crate::feedback::FeedbackDispatcher;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// A feedback request for the actuator driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCommand {
    pub label: GestureLabel,
    pub issued_at: DateTime<Utc>,
}

impl FeedbackCommand {
    pub fn new(label: GestureLabel) -> Self {
        Self {
            label,
            issued_at: Utc::now(),
        }
    }
}

/// Logs each trigger and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

impl FeedbackDispatcher for LoggingDispatcher {
    fn trigger_grasp(&mut self) {
        tracing::info!(gesture = "grasp", "feedback");
    }

    fn trigger_pinch(&mut self) {
        tracing::info!(gesture = "pinch", "feedback");
    }

    fn trigger_resting(&mut self) {
        tracing::info!(gesture = "resting", "feedback");
    }
}

/// Forwards commands to a driver thread without blocking.
///
/// When the driver falls behind and the channel is full, the command is
/// dropped and counted.
pub struct ChannelDispatcher {
    sender: Sender<FeedbackCommand>,
    dropped: u64,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiver the driver reads from.
    pub fn new(capacity: usize) -> (Self, Receiver<FeedbackCommand>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender, dropped: 0 }, receiver)
    }

    /// Commands that could not be delivered.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn send(&mut self, label: GestureLabel) {
        match self.sender.try_send(FeedbackCommand::new(label)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                tracing::debug!(%label, "feedback channel full; command dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
                tracing::debug!(%label, "feedback driver gone; command dropped");
            }
        }
    }
}

impl FeedbackDispatcher for ChannelDispatcher {
    fn trigger_grasp(&mut self) {
        self.send(GestureLabel::Grasp);
    }

    fn trigger_pinch(&mut self) {
        self.send(GestureLabel::Pinch);
    }

    fn trigger_resting(&mut self) {
        self.send(GestureLabel::Resting);
    }
}

/// Records triggers in order. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    calls: Arc<Mutex<Vec<GestureLabel>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers received so far.
    pub fn calls(&self) -> Vec<GestureLabel> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&mut self, label: GestureLabel) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(label);
        }
    }
}

impl FeedbackDispatcher for RecordingDispatcher {
    fn trigger_grasp(&mut self) {
        self.record(GestureLabel::Grasp);
    }

    fn trigger_pinch(&mut self) {
        self.record(GestureLabel::Pinch);
    }

    fn trigger_resting(&mut self) {
        self.record(GestureLabel::Resting);
    }
}
