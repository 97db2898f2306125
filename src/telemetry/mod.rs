//! Observability for the gesture pipeline.
//!
//! Counters record what the pipeline did with every tick so an operator can
//! see how often samples were missing, duplicated or discarded, and how often
//! feedback was sent. [`PipelineStatus`] is the per-tick snapshot a debug
//! overlay would show.

pub mod counters;
pub mod status;

// Re-export commonly used types
pub use counters::{create_shared_telemetry, SharedTelemetry, Telemetry, TelemetryStats};
pub use status::PipelineStatus;
