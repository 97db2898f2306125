//! Session counters.
//!
//! Every counter is a relaxed atomic so the pipeline thread can record while
//! the CLI reads a snapshot from another thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Pipeline statistics for the current session.
#[derive(Debug)]
pub struct Telemetry {
    /// Samples appended to the window buffer
    samples_accepted: AtomicU64,
    /// Samples dropped because they repeated the previous reading
    duplicates_skipped: AtomicU64,
    /// Ticks on which the source had nothing to offer
    ticks_without_sample: AtomicU64,
    /// Ticks skipped because a classification was still in progress
    ticks_rejected_busy: AtomicU64,
    windows_classified: AtomicU64,
    inconclusive_decisions: AtomicU64,
    /// Windows discarded because the classifier output was unusable
    malformed_outputs: AtomicU64,
    stable_updates: AtomicU64,
    feedback_sent: AtomicU64,
    scaler_fallbacks: AtomicU64,
    backend_fallbacks: AtomicU64,
    instance_id: Uuid,
    session_start: DateTime<Utc>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            samples_accepted: AtomicU64::new(0),
            duplicates_skipped: AtomicU64::new(0),
            ticks_without_sample: AtomicU64::new(0),
            ticks_rejected_busy: AtomicU64::new(0),
            windows_classified: AtomicU64::new(0),
            inconclusive_decisions: AtomicU64::new(0),
            malformed_outputs: AtomicU64::new(0),
            stable_updates: AtomicU64::new(0),
            feedback_sent: AtomicU64::new(0),
            scaler_fallbacks: AtomicU64::new(0),
            backend_fallbacks: AtomicU64::new(0),
            instance_id: Uuid::new_v4(),
            session_start: Utc::now(),
        }
    }

    pub fn record_sample_accepted(&self) {
        self.samples_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missing_sample(&self) {
        self.ticks_without_sample.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_busy_tick(&self) {
        self.ticks_rejected_busy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_classified(&self) {
        self.windows_classified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inconclusive(&self) {
        self.inconclusive_decisions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed_output(&self) {
        self.malformed_outputs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stable_update(&self) {
        self.stable_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feedback_sent(&self) {
        self.feedback_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scaler_fallback(&self) {
        self.scaler_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_fallback(&self) {
        self.backend_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            instance_id: self.instance_id,
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            ticks_without_sample: self.ticks_without_sample.load(Ordering::Relaxed),
            ticks_rejected_busy: self.ticks_rejected_busy.load(Ordering::Relaxed),
            windows_classified: self.windows_classified.load(Ordering::Relaxed),
            inconclusive_decisions: self.inconclusive_decisions.load(Ordering::Relaxed),
            malformed_outputs: self.malformed_outputs.load(Ordering::Relaxed),
            stable_updates: self.stable_updates.load(Ordering::Relaxed),
            feedback_sent: self.feedback_sent.load(Ordering::Relaxed),
            scaler_fallbacks: self.scaler_fallbacks.load(Ordering::Relaxed),
            backend_fallbacks: self.backend_fallbacks.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics ({}):\n\
             - Samples accepted: {}\n\
             - Duplicate samples skipped: {}\n\
             - Ticks without a sample: {}\n\
             - Ticks skipped while busy: {}\n\
             - Windows classified: {}\n\
             - Inconclusive decisions: {}\n\
             - Malformed classifier outputs: {}\n\
             - Stable label updates: {}\n\
             - Feedback commands sent: {}\n\
             - Scaler fallbacks: {}\n\
             - Backend fallbacks: {}\n\
             - Session duration: {} seconds",
            stats.instance_id,
            stats.samples_accepted,
            stats.duplicates_skipped,
            stats.ticks_without_sample,
            stats.ticks_rejected_busy,
            stats.windows_classified,
            stats.inconclusive_decisions,
            stats.malformed_outputs,
            stats.stable_updates,
            stats.feedback_sent,
            stats.scaler_fallbacks,
            stats.backend_fallbacks,
            stats.session_duration_secs
        )
    }

    /// Write the current statistics as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.stats()).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the session counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryStats {
    pub instance_id: Uuid,
    pub samples_accepted: u64,
    pub duplicates_skipped: u64,
    pub ticks_without_sample: u64,
    pub ticks_rejected_busy: u64,
    pub windows_classified: u64,
    pub inconclusive_decisions: u64,
    pub malformed_outputs: u64,
    pub stable_updates: u64,
    pub feedback_sent: u64,
    pub scaler_fallbacks: u64,
    pub backend_fallbacks: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared telemetry.
pub type SharedTelemetry = Arc<Telemetry>;

pub fn create_shared_telemetry() -> SharedTelemetry {
    Arc::new(Telemetry::new())
}
