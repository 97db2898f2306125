//! Gesture labels and the confidence-gated decision policy.
//!
//! The policy turns a raw probability distribution into either a candidate
//! label for the smoother or an inconclusive outcome (no update this tick).
//! Low-confidence gestures fall back to the neutral resting state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of gesture classes the model scores.
pub const NUM_CLASSES: usize = 3;

/// Recognized gestures. Discriminants match the model's output indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureLabel {
    Grasp = 0,
    Pinch = 1,
    Resting = 2,
}

impl GestureLabel {
    /// All labels in model output order.
    pub const ALL: [GestureLabel; NUM_CLASSES] =
        [GestureLabel::Grasp, GestureLabel::Pinch, GestureLabel::Resting];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GestureLabel::Grasp => "grasp",
            GestureLabel::Pinch => "pinch",
            GestureLabel::Resting => "resting",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grasp" | "fist" => Ok(GestureLabel::Grasp),
            "pinch" => Ok(GestureLabel::Pinch),
            "resting" | "rest" => Ok(GestureLabel::Resting),
            other => Err(format!("unknown gesture '{other}'")),
        }
    }
}

/// Class probabilities indexed by [`GestureLabel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityDistribution([f32; NUM_CLASSES]);

impl ProbabilityDistribution {
    pub fn new(probabilities: [f32; NUM_CLASSES]) -> Self {
        Self(probabilities)
    }

    /// Wrap a model output. Returns `None` unless it has one value per class.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        values.try_into().ok().map(Self)
    }

    pub fn get(&self, label: GestureLabel) -> f32 {
        self.0[label.index()]
    }

    pub fn as_array(&self) -> &[f32; NUM_CLASSES] {
        &self.0
    }

    /// Most probable class. The lowest index wins a tie.
    pub fn argmax(&self) -> (GestureLabel, f32) {
        let mut best = GestureLabel::Grasp;
        let mut best_p = self.0[0];
        for label in &GestureLabel::ALL[1..] {
            let p = self.get(*label);
            if p > best_p {
                best = *label;
                best_p = p;
            }
        }
        (best, best_p)
    }
}

/// Operator-tunable confidence thresholds, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum probability to accept a resting prediction
    pub resting: f32,
    /// Minimum probability to accept a pinch prediction
    pub pinch: f32,
    /// Minimum probability to accept a grasp prediction
    pub grasp: f32,
    /// Below this, a grasp or pinch prediction defaults to resting
    pub uncertain: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            resting: 0.6,
            pinch: 0.5,
            grasp: 0.5,
            uncertain: 0.4,
        }
    }
}

impl Thresholds {
    /// Name of the first threshold outside [0, 1], if any.
    pub fn first_invalid(&self) -> Option<(&'static str, f32)> {
        [
            ("resting", self.resting),
            ("pinch", self.pinch),
            ("grasp", self.grasp),
            ("uncertain", self.uncertain),
        ]
        .into_iter()
        .find(|(_, v)| !(0.0..=1.0).contains(v))
    }
}

/// Why a tick produced no candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconclusiveReason {
    RestingBelowThreshold,
    GraspBelowThreshold,
    PinchBelowThreshold,
}

/// A label the smoother should consider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: GestureLabel,
    pub confidence: f32,
}

/// Outcome of the decision policy for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Inconclusive(InconclusiveReason),
    Candidate(Candidate),
}

impl Decision {
    pub fn candidate(&self) -> Option<Candidate> {
        match self {
            Decision::Candidate(c) => Some(*c),
            Decision::Inconclusive(_) => None,
        }
    }
}

/// Applies the thresholds to a probability distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionPolicy {
    thresholds: Thresholds,
}

impl DecisionPolicy {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Decide on a candidate for this tick.
    pub fn decide(&self, distribution: &ProbabilityDistribution) -> Decision {
        let t = &self.thresholds;
        let (mut label, mut p) = distribution.argmax();

        if label == GestureLabel::Resting && p < t.resting {
            tracing::debug!(p, "resting predicted below threshold");
            return Decision::Inconclusive(InconclusiveReason::RestingBelowThreshold);
        } else if label != GestureLabel::Resting && p < t.uncertain {
            tracing::debug!(%label, p, "low confidence; defaulting to resting");
            label = GestureLabel::Resting;
            p = distribution.get(GestureLabel::Resting);
        }

        match label {
            GestureLabel::Grasp if p < t.grasp => {
                Decision::Inconclusive(InconclusiveReason::GraspBelowThreshold)
            }
            GestureLabel::Pinch if p < t.pinch => {
                Decision::Inconclusive(InconclusiveReason::PinchBelowThreshold)
            }
            _ => Decision::Candidate(Candidate {
                label,
                confidence: p,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DecisionPolicy {
        DecisionPolicy::new(Thresholds {
            resting: 0.6,
            grasp: 0.5,
            pinch: 0.5,
            uncertain: 0.4,
        })
    }

    fn dist(grasp: f32, pinch: f32, resting: f32) -> ProbabilityDistribution {
        ProbabilityDistribution::new([grasp, pinch, resting])
    }

    #[test]
    fn test_confident_grasp_is_candidate() {
        let decision = policy().decide(&dist(0.55, 0.05, 0.40));
        assert_eq!(
            decision,
            Decision::Candidate(Candidate {
                label: GestureLabel::Grasp,
                confidence: 0.55
            })
        );
    }

    #[test]
    fn test_weak_resting_is_inconclusive() {
        assert_eq!(
            policy().decide(&dist(0.2, 0.25, 0.55)),
            Decision::Inconclusive(InconclusiveReason::RestingBelowThreshold)
        );
    }

    #[test]
    fn test_uncertain_gesture_defaults_to_resting() {
        // Pinch wins the argmax at 0.38 < uncertain, so resting @ 0.32 is emitted
        // even though it is below the resting threshold.
        let decision = policy().decide(&dist(0.30, 0.38, 0.32));
        assert_eq!(
            decision,
            Decision::Candidate(Candidate {
                label: GestureLabel::Resting,
                confidence: 0.32
            })
        );
    }

    #[test]
    fn test_grasp_between_uncertain_and_grasp_threshold() {
        let decision = policy().decide(&dist(0.45, 0.20, 0.35));
        assert_eq!(
            decision,
            Decision::Inconclusive(InconclusiveReason::GraspBelowThreshold)
        );
    }

    #[test]
    fn test_pinch_between_uncertain_and_pinch_threshold() {
        let decision = policy().decide(&dist(0.10, 0.48, 0.42));
        assert_eq!(
            decision,
            Decision::Inconclusive(InconclusiveReason::PinchBelowThreshold)
        );
    }

    #[test]
    fn test_confident_resting_and_pinch() {
        assert_eq!(
            policy().decide(&dist(0.1, 0.1, 0.8)).candidate().unwrap().label,
            GestureLabel::Resting
        );
        assert_eq!(
            policy().decide(&dist(0.1, 0.7, 0.2)).candidate().unwrap().label,
            GestureLabel::Pinch
        );
    }

    #[test]
    fn test_argmax_tie_prefers_lower_index() {
        let (label, p) = dist(0.4, 0.4, 0.2).argmax();
        assert_eq!(label, GestureLabel::Grasp);
        assert_eq!(p, 0.4);
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!("Fist".parse::<GestureLabel>(), Ok(GestureLabel::Grasp));
        assert_eq!(" pinch ".parse::<GestureLabel>(), Ok(GestureLabel::Pinch));
        assert_eq!("rest".parse::<GestureLabel>(), Ok(GestureLabel::Resting));
        assert!("wave".parse::<GestureLabel>().is_err());
        assert_eq!(GestureLabel::from_index(2), Some(GestureLabel::Resting));
        assert_eq!(GestureLabel::from_index(3), None);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(Thresholds::default().first_invalid().is_none());
        let bad = Thresholds {
            grasp: 1.5,
            ..Thresholds::default()
        };
        assert_eq!(bad.first_invalid(), Some(("grasp", 1.5)));
        let nan = Thresholds {
            uncertain: f32::NAN,
            ..Thresholds::default()
        };
        assert_eq!(nan.first_invalid().map(|(name, _)| name), Some("uncertain"));
    }
}
