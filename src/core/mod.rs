//! Streaming gesture classification core.
//!
//! This module contains:
//! - Window buffering with deduplication and 50% overlap
//! - Per-channel time-domain feature extraction
//! - Feature standardization and the classifier backends
//! - The decision policy, temporal smoothing and the tick-driven pipeline

pub mod classifier;
pub mod decision;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod scaler;
pub mod smoothing;
pub mod windowing;

// Re-export commonly used types
pub use classifier::{
    BackendError, BackendFactory, BackendKind, BackendPreference, BackendSelection, Classifier,
    ClassifyError, DefaultBackendFactory, InferenceBackend, PortableBackend,
};
pub use decision::{
    Candidate, Decision, DecisionPolicy, GestureLabel, InconclusiveReason,
    ProbabilityDistribution, Thresholds, NUM_CLASSES,
};
pub use features::{extract_features, Feature, FeatureVector, NUM_FEATURES};
pub use model::{Activation, DenseLayer, ModelArtifact, ModelError};
pub use pipeline::{GesturePipeline, PipelineState, TickOutcome};
pub use scaler::{LoadedScaler, ScalerError, ScalerParams, Standardizer};
pub use smoothing::{StableLabel, TemporalSmoother, MIN_AGREEMENT, PREDICTION_POOL_SIZE};
pub use windowing::{Observation, Window, WindowBuffer, HOP_SIZE, WINDOW_SIZE};
