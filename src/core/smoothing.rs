//! Majority-vote smoothing of candidate labels.
//!
//! Raw per-window candidates flicker. The smoother keeps the last
//! [`PREDICTION_POOL_SIZE`] candidates and, once the pool is full, publishes
//! the most frequent label as the stable label when it appears at least
//! [`MIN_AGREEMENT`] times. The rule fires on every qualifying candidate,
//! including when the stable label does not change.

use crate::core::decision::{Candidate, GestureLabel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of recent candidates considered.
pub const PREDICTION_POOL_SIZE: usize = 5;

/// Minimum occurrences of the majority label before it is published.
pub const MIN_AGREEMENT: usize = 2;

/// The externally visible, smoothed gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StableLabel {
    pub label: GestureLabel,
    /// Confidence of the candidate that triggered this update
    pub confidence: f32,
    pub updated_at: DateTime<Utc>,
}

/// Bounded candidate history with majority vote.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    history: VecDeque<GestureLabel>,
    pool_size: usize,
    min_agreement: usize,
    stable: Option<StableLabel>,
}

impl TemporalSmoother {
    pub fn new() -> Self {
        Self::with_pool(PREDICTION_POOL_SIZE, MIN_AGREEMENT)
    }

    /// Create a smoother with a custom pool size and agreement count.
    pub fn with_pool(pool_size: usize, min_agreement: usize) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            history: VecDeque::with_capacity(pool_size + 1),
            pool_size,
            min_agreement: min_agreement.max(1),
            stable: None,
        }
    }

    /// Record a candidate.
    ///
    /// Returns the stable label when the majority rule fired for this
    /// candidate; the caller dispatches feedback for it.
    pub fn push(&mut self, candidate: Candidate) -> Option<StableLabel> {
        self.history.push_back(candidate.label);
        while self.history.len() > self.pool_size {
            self.history.pop_front();
        }

        if self.history.len() < self.pool_size {
            return None;
        }

        let (label, count) = self.majority()?;
        if count < self.min_agreement {
            return None;
        }

        let stable = StableLabel {
            label,
            confidence: candidate.confidence,
            updated_at: Utc::now(),
        };
        self.stable = Some(stable);
        Some(stable)
    }

    /// Most frequent label in the history with its count.
    ///
    /// Ties go to the label whose first occurrence is oldest.
    pub fn majority(&self) -> Option<(GestureLabel, usize)> {
        let mut groups: Vec<(GestureLabel, usize)> = Vec::with_capacity(GestureLabel::ALL.len());
        for label in &self.history {
            match groups.iter_mut().find(|(l, _)| l == label) {
                Some((_, count)) => *count += 1,
                None => groups.push((*label, 1)),
            }
        }

        let mut best: Option<(GestureLabel, usize)> = None;
        for (label, count) in groups {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((label, count));
            }
        }
        best
    }

    /// The current stable label, if one has been published.
    pub fn stable(&self) -> Option<StableLabel> {
        self.stable
    }

    /// Candidate history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &GestureLabel> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl Default for TemporalSmoother {
    fn default() -> Self {
        Self::new()
    }
}
