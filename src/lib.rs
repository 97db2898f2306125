//! EMG Gesture Agent - streaming hand-gesture recognition from an 8-channel
//! EMG armband.
//!
//! The agent turns raw armband samples into a smoothed gesture label and
//! fires haptic feedback whenever that label is (re)published.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        EMG Gesture Agent                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌─────────────┐   │
//! │  │  Source  │──▶│ Windowing │──▶│ Features │──▶│ Standardize │   │
//! │  │ (armband)│   │ (18 / 9)  │   │   (48)   │   │             │   │
//! │  └──────────┘   └───────────┘   └──────────┘   └─────────────┘   │
//! │                                                      │           │
//! │                                                      ▼           │
//! │  ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌─────────────┐   │
//! │  │ Feedback │◀──│ Smoothing │◀──│ Decision │◀──│ Classifier  │   │
//! │  │ (tactor) │   │  (5 / 2)  │   │ (policy) │   │ (backends)  │   │
//! │  └──────────┘   └───────────┘   └──────────┘   └─────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use emg_gesture_agent::core::{
//!     BackendPreference, Classifier, GesturePipeline, ModelArtifact, ScalerParams, Standardizer,
//!     Thresholds,
//! };
//! use emg_gesture_agent::feedback::LoggingDispatcher;
//! use emg_gesture_agent::source::SyntheticArmband;
//! use emg_gesture_agent::telemetry::create_shared_telemetry;
//! use std::path::Path;
//!
//! let model = ModelArtifact::load(Path::new("model.json")).expect("model");
//! let scaler = ScalerParams::load_or_identity(Some(Path::new("scaler.json")));
//! let classifier = Classifier::new(&model, BackendPreference::Auto).expect("backend");
//! let standardizer = Standardizer::new(scaler.params).expect("scaler");
//!
//! let mut pipeline = GesturePipeline::new(
//!     classifier,
//!     standardizer,
//!     Thresholds::default(),
//!     Box::new(LoggingDispatcher),
//!     create_shared_telemetry(),
//! );
//!
//! let mut armband = SyntheticArmband::new(vec![], 70, 7);
//! for _ in 0..1000 {
//!     pipeline.tick(&mut armband);
//! }
//! pipeline.shutdown();
//! ```

pub mod config;
pub mod core;
pub mod feedback;
pub mod source;
pub mod telemetry;

// Re-export key types at crate root for convenience
pub use crate::config::{Config, ConfigError};
pub use crate::core::{
    Classifier, GestureLabel, GesturePipeline, ModelArtifact, StableLabel, Standardizer,
    Thresholds, TickOutcome,
};
pub use crate::feedback::FeedbackDispatcher;
pub use crate::source::{Sample, SampleSource};
pub use crate::telemetry::{PipelineStatus, SharedTelemetry, Telemetry, TelemetryStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
