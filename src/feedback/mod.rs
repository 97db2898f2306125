//! Feedback dispatch boundary.
//!
//! When the stable gesture is (re)published the pipeline calls exactly one
//! trigger on a [`FeedbackDispatcher`]. Dispatchers must return immediately;
//! the haptic driver or UI that acts on the command lives elsewhere.

pub mod dispatcher;

// Re-export commonly used types
pub use dispatcher::{ChannelDispatcher, FeedbackCommand, LoggingDispatcher, RecordingDispatcher};

use crate::core::decision::GestureLabel;

/// Receiver of stable-gesture feedback.
pub trait FeedbackDispatcher: Send {
    fn trigger_grasp(&mut self);

    fn trigger_pinch(&mut self);

    fn trigger_resting(&mut self);

    /// Route a label to its trigger.
    fn dispatch(&mut self, label: GestureLabel) {
        match label {
            GestureLabel::Grasp => self.trigger_grasp(),
            GestureLabel::Pinch => self.trigger_pinch(),
            GestureLabel::Resting => self.trigger_resting(),
        }
    }
}
