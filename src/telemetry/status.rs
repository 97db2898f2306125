//! Snapshot of what the pipeline currently believes.

use crate::core::classifier::BackendSelection;
use crate::core::decision::{Candidate, GestureLabel};
use crate::core::smoothing::StableLabel;
use serde::{Deserialize, Serialize};

/// Current candidate and stable label, with the active backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Candidate from the most recent conclusive window
    pub candidate: Option<Candidate>,
    pub stable: Option<StableLabel>,
    pub backend: BackendSelection,
    pub buffered_samples: usize,
}

impl PipelineStatus {
    pub fn stable_label(&self) -> Option<GestureLabel> {
        self.stable.map(|s| s.label)
    }

    /// One-line rendering for a console overlay.
    pub fn overlay(&self) -> String {
        let current = match self.candidate {
            Some(c) => format!("{} ({:.2})", c.label, c.confidence),
            None => "-".to_string(),
        };
        let stable = match self.stable {
            Some(s) => format!("{} ({:.2})", s.label, s.confidence),
            None => "-".to_string(),
        };
        format!(
            "current: {current} | stable: {stable} | backend: {}",
            self.backend.selected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::BackendKind;
    use chrono::Utc;

    #[test]
    fn test_overlay_rendering() {
        let status = PipelineStatus {
            candidate: Some(Candidate {
                label: GestureLabel::Pinch,
                confidence: 0.734,
            }),
            stable: Some(StableLabel {
                label: GestureLabel::Grasp,
                confidence: 0.9,
                updated_at: Utc::now(),
            }),
            backend: BackendSelection {
                selected: BackendKind::Portable,
                fallback_reason: None,
            },
            buffered_samples: 4,
        };

        let line = status.overlay();
        assert!(line.contains("current: pinch (0.73)"));
        assert!(line.contains("stable: grasp (0.90)"));
        assert_eq!(status.stable_label(), Some(GestureLabel::Grasp));
    }

    #[test]
    fn test_overlay_without_labels() {
        let status = PipelineStatus {
            candidate: None,
            stable: None,
            backend: BackendSelection {
                selected: BackendKind::Portable,
                fallback_reason: Some("no accelerator".to_string()),
            },
            buffered_samples: 0,
        };
        assert!(status.overlay().starts_with("current: - | stable: -"));
    }
}
