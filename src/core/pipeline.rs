//! Tick-driven gesture pipeline.
//!
//! One call to [`GesturePipeline::tick`] is one full pass: fetch the latest
//! sample, buffer it, and once a window is full run feature extraction,
//! standardization, classification, the decision policy and the smoother,
//! dispatching feedback when the smoother publishes a stable label.
//!
//! Ticks never overlap. The pipeline carries an explicit
//! [`PipelineState`] guard so a tick that arrives while another pass is in
//! flight is rejected instead of interleaving with it.

use crate::core::classifier::{Classifier, ClassifyError};
use crate::core::decision::{Candidate, Decision, DecisionPolicy, GestureLabel, Thresholds};
use crate::core::features::extract_features;
use crate::core::scaler::Standardizer;
use crate::core::smoothing::{StableLabel, TemporalSmoother};
use crate::core::windowing::{Observation, WindowBuffer};
use crate::feedback::FeedbackDispatcher;
use crate::source::SampleSource;
use crate::telemetry::{PipelineStatus, SharedTelemetry};

/// Re-entrancy guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Classifying,
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The source had no sample
    NoSample,
    /// The sample repeated the previous reading and was dropped
    Duplicate,
    /// The sample was buffered; the window is not full yet
    Buffering { len: usize },
    /// A window was classified but no threshold was met
    Inconclusive,
    /// A window produced a candidate label
    Candidate {
        label: GestureLabel,
        confidence: f32,
        /// Set when the smoother published (and feedback was dispatched)
        stable: Option<StableLabel>,
    },
    /// A window was dropped because classification failed
    Discarded(ClassifyError),
    /// A previous pass was still in flight
    Busy,
}

/// The streaming classification pipeline.
pub struct GesturePipeline {
    state: PipelineState,
    buffer: WindowBuffer,
    standardizer: Standardizer,
    classifier: Classifier,
    policy: DecisionPolicy,
    smoother: TemporalSmoother,
    dispatcher: Box<dyn FeedbackDispatcher>,
    telemetry: SharedTelemetry,
    last_candidate: Option<Candidate>,
}

impl GesturePipeline {
    pub fn new(
        classifier: Classifier,
        standardizer: Standardizer,
        thresholds: Thresholds,
        dispatcher: Box<dyn FeedbackDispatcher>,
        telemetry: SharedTelemetry,
    ) -> Self {
        if classifier.selection().fell_back() {
            telemetry.record_backend_fallback();
        }
        Self {
            state: PipelineState::Idle,
            buffer: WindowBuffer::new(),
            standardizer,
            classifier,
            policy: DecisionPolicy::new(thresholds),
            smoother: TemporalSmoother::new(),
            dispatcher,
            telemetry,
            last_candidate: None,
        }
    }

    /// Replace the smoother, e.g. to change the pool size.
    pub fn with_smoother(mut self, smoother: TemporalSmoother) -> Self {
        self.smoother = smoother;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Enter the in-flight state. Returns false if a pass is already in
    /// flight, in which case the state is unchanged.
    pub fn begin_tick(&mut self) -> bool {
        match self.state {
            PipelineState::Classifying => false,
            PipelineState::Idle => {
                self.state = PipelineState::Classifying;
                true
            }
        }
    }

    /// Return to idle.
    pub fn end_tick(&mut self) {
        self.state = PipelineState::Idle;
    }

    /// Run one pipeline pass.
    pub fn tick(&mut self, source: &mut dyn SampleSource) -> TickOutcome {
        if !self.begin_tick() {
            self.telemetry.record_busy_tick();
            tracing::warn!("tick arrived while a pass was in flight; skipped");
            return TickOutcome::Busy;
        }
        let outcome = self.run_pass(source);
        self.end_tick();
        outcome
    }

    fn run_pass(&mut self, source: &mut dyn SampleSource) -> TickOutcome {
        let Some(sample) = source.latest_sample() else {
            self.telemetry.record_missing_sample();
            tracing::trace!("no sample available");
            return TickOutcome::NoSample;
        };

        match self.buffer.observe(sample) {
            Observation::Duplicate => {
                self.telemetry.record_duplicate();
                TickOutcome::Duplicate
            }
            Observation::Accepted { ready: false } => {
                self.telemetry.record_sample_accepted();
                TickOutcome::Buffering {
                    len: self.buffer.len(),
                }
            }
            Observation::Accepted { ready: true } => {
                self.telemetry.record_sample_accepted();
                self.classify_window()
            }
        }
    }

    fn classify_window(&mut self) -> TickOutcome {
        let Some(window) = self.buffer.window() else {
            return TickOutcome::Buffering {
                len: self.buffer.len(),
            };
        };

        let features = self.standardizer.standardize(&extract_features(&window));
        let result = self.classifier.classify(&features);
        // The window advances whether or not classification succeeded
        self.buffer.drain_half();

        let distribution = match result {
            Ok(distribution) => distribution,
            Err(e) => {
                self.telemetry.record_malformed_output();
                tracing::warn!("discarding window: {e}");
                return TickOutcome::Discarded(e);
            }
        };
        self.telemetry.record_window_classified();

        let candidate = match self.policy.decide(&distribution) {
            Decision::Inconclusive(reason) => {
                self.telemetry.record_inconclusive();
                tracing::debug!(?reason, probabilities = ?distribution.as_array(), "inconclusive");
                return TickOutcome::Inconclusive;
            }
            Decision::Candidate(candidate) => candidate,
        };
        self.last_candidate = Some(candidate);
        tracing::debug!(
            label = %candidate.label,
            confidence = candidate.confidence,
            "candidate"
        );

        let previous = self.smoother.stable().map(|s| s.label);
        let stable = self.smoother.push(candidate);
        if let Some(stable) = stable {
            self.telemetry.record_stable_update();
            if previous != Some(stable.label) {
                tracing::info!(
                    label = %stable.label,
                    confidence = stable.confidence,
                    "stable gesture changed"
                );
            }
            self.dispatcher.dispatch(stable.label);
            self.telemetry.record_feedback_sent();
        }

        TickOutcome::Candidate {
            label: candidate.label,
            confidence: candidate.confidence,
            stable,
        }
    }

    /// The most recently published stable label.
    pub fn stable(&self) -> Option<StableLabel> {
        self.smoother.stable()
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            candidate: self.last_candidate,
            stable: self.smoother.stable(),
            backend: self.classifier.selection().clone(),
            buffered_samples: self.buffer.len(),
        }
    }

    pub fn telemetry(&self) -> &SharedTelemetry {
        &self.telemetry
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn buffer(&self) -> &WindowBuffer {
        &self.buffer
    }

    /// Release the classifier backend. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.classifier.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{
        BackendError, BackendFactory, BackendKind, BackendPreference, InferenceBackend,
    };
    use crate::core::model::tests::sample_model;
    use crate::core::model::ModelArtifact;
    use crate::core::windowing::{HOP_SIZE, WINDOW_SIZE};
    use crate::feedback::RecordingDispatcher;
    use crate::source::{ReplaySource, Sample, CHANNEL_COUNT};
    use crate::telemetry::create_shared_telemetry;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Backend that replays scripted outputs, repeating the last one.
    struct ScriptedBackend {
        outputs: Arc<Mutex<VecDeque<Vec<f32>>>>,
        last: Vec<f32>,
    }

    impl InferenceBackend for ScriptedBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Portable
        }

        fn run(&mut self, _input: &[f32]) -> Result<Vec<f32>, BackendError> {
            if let Some(next) = self.outputs.lock().unwrap().pop_front() {
                self.last = next;
            }
            Ok(self.last.clone())
        }
    }

    struct ScriptedFactory(Arc<Mutex<VecDeque<Vec<f32>>>>);

    impl BackendFactory for ScriptedFactory {
        fn accelerated(
            &self,
            _model: &ModelArtifact,
        ) -> Result<Box<dyn InferenceBackend>, BackendError> {
            Err(BackendError::Unavailable("scripted".to_string()))
        }

        fn portable(
            &self,
            _model: &ModelArtifact,
        ) -> Result<Box<dyn InferenceBackend>, BackendError> {
            Ok(Box::new(ScriptedBackend {
                outputs: Arc::clone(&self.0),
                last: vec![0.1, 0.1, 0.8],
            }))
        }
    }

    fn scripted_pipeline(outputs: Vec<Vec<f32>>) -> (GesturePipeline, RecordingDispatcher) {
        let factory = ScriptedFactory(Arc::new(Mutex::new(outputs.into())));
        let classifier =
            Classifier::with_factory(&sample_model(), BackendPreference::Portable, &factory)
                .unwrap();
        let recorder = RecordingDispatcher::new();
        let pipeline = GesturePipeline::new(
            classifier,
            Standardizer::identity(),
            Thresholds::default(),
            Box::new(recorder.clone()),
            create_shared_telemetry(),
        );
        (pipeline, recorder)
    }

    /// Distinct readings so nothing is deduplicated.
    fn readings(count: usize) -> Vec<[i32; CHANNEL_COUNT]> {
        (0..count)
            .map(|i| {
                let mut r = [0; CHANNEL_COUNT];
                for (c, v) in r.iter_mut().enumerate() {
                    *v = ((i * 7 + c * 3) % 41) as i32 - 20 + i as i32;
                }
                r
            })
            .collect()
    }

    fn run(
        pipeline: &mut GesturePipeline,
        source: &mut dyn SampleSource,
        ticks: usize,
    ) -> Vec<TickOutcome> {
        (0..ticks).map(|_| pipeline.tick(source)).collect()
    }

    fn classifications(outcomes: &[TickOutcome]) -> usize {
        outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    TickOutcome::Candidate { .. }
                        | TickOutcome::Inconclusive
                        | TickOutcome::Discarded(_)
                )
            })
            .count()
    }

    #[test]
    fn test_first_window_after_eighteen_samples() {
        let (mut pipeline, _) = scripted_pipeline(vec![]);
        let mut source = ReplaySource::from_readings(&readings(WINDOW_SIZE));

        let outcomes = run(&mut pipeline, &mut source, WINDOW_SIZE);
        assert_eq!(outcomes[0], TickOutcome::Buffering { len: 1 });
        assert_eq!(
            outcomes[WINDOW_SIZE - 2],
            TickOutcome::Buffering {
                len: WINDOW_SIZE - 1
            }
        );
        assert!(matches!(outcomes[WINDOW_SIZE - 1], TickOutcome::Candidate { .. }));
        assert_eq!(pipeline.buffer().len(), WINDOW_SIZE - HOP_SIZE);
    }

    #[test]
    fn test_classifies_every_hop_after_first_window() {
        let (mut pipeline, _) = scripted_pipeline(vec![]);
        let total = WINDOW_SIZE + 4 * HOP_SIZE;
        let mut source = ReplaySource::from_readings(&readings(total));

        let outcomes = run(&mut pipeline, &mut source, total);
        assert_eq!(classifications(&outcomes), 5);
        assert_eq!(pipeline.telemetry().stats().windows_classified, 5);
    }

    #[test]
    fn test_stalled_source_never_classifies() {
        let (mut pipeline, _) = scripted_pipeline(vec![]);
        let mut source = ReplaySource::from_readings(&[[5; CHANNEL_COUNT]]);

        let outcomes = run(&mut pipeline, &mut source, 50);
        assert_eq!(outcomes[0], TickOutcome::Buffering { len: 1 });
        assert!(outcomes[1..].iter().all(|o| *o == TickOutcome::Duplicate));
        assert_eq!(pipeline.buffer().len(), 1);
        assert_eq!(pipeline.telemetry().stats().duplicates_skipped, 49);
    }

    #[test]
    fn test_missing_sample_is_no_op() {
        struct Empty;
        impl SampleSource for Empty {
            fn latest_sample(&mut self) -> Option<Sample> {
                None
            }
        }

        let (mut pipeline, _) = scripted_pipeline(vec![]);
        assert_eq!(pipeline.tick(&mut Empty), TickOutcome::NoSample);
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert_eq!(pipeline.telemetry().stats().ticks_without_sample, 1);
    }

    #[test]
    fn test_busy_guard_rejects_overlapping_tick() {
        let (mut pipeline, _) = scripted_pipeline(vec![]);
        let mut source = ReplaySource::from_readings(&readings(2));

        assert!(pipeline.begin_tick());
        assert!(!pipeline.begin_tick());
        assert_eq!(pipeline.tick(&mut source), TickOutcome::Busy);
        // Nothing was read from the source while busy
        assert_eq!(source.remaining(), 2);
        assert_eq!(pipeline.buffer().len(), 0);

        pipeline.end_tick();
        assert_eq!(pipeline.tick(&mut source), TickOutcome::Buffering { len: 1 });
        assert_eq!(pipeline.telemetry().stats().ticks_rejected_busy, 1);
    }

    #[test]
    fn test_stable_pinch_dispatches_feedback() {
        let pinch = vec![0.2, 0.7, 0.1];
        let (mut pipeline, recorder) = scripted_pipeline(vec![pinch; 8]);
        let total = WINDOW_SIZE + 4 * HOP_SIZE;
        let mut source = ReplaySource::from_readings(&readings(total));

        let outcomes = run(&mut pipeline, &mut source, total);
        let last = outcomes.last().unwrap();
        match last {
            TickOutcome::Candidate { label, stable, .. } => {
                assert_eq!(*label, GestureLabel::Pinch);
                assert_eq!(stable.map(|s| s.label), Some(GestureLabel::Pinch));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(recorder.calls(), vec![GestureLabel::Pinch]);
        assert_eq!(pipeline.status().stable_label(), Some(GestureLabel::Pinch));
    }

    #[test]
    fn test_inconclusive_windows_do_not_reach_smoother() {
        // resting 0.55 is below its 0.6 threshold
        let (mut pipeline, recorder) = scripted_pipeline(vec![vec![0.2, 0.25, 0.55]; 10]);
        let total = WINDOW_SIZE + 8 * HOP_SIZE;
        let mut source = ReplaySource::from_readings(&readings(total));

        let outcomes = run(&mut pipeline, &mut source, total);
        assert!(outcomes
            .iter()
            .filter(|o| !matches!(o, TickOutcome::Buffering { .. }))
            .all(|o| *o == TickOutcome::Inconclusive));
        assert!(recorder.calls().is_empty());
        assert!(pipeline.stable().is_none());
        assert!(pipeline.status().candidate.is_none());
    }

    #[test]
    fn test_malformed_output_discards_and_keeps_stable_label() {
        let grasp = vec![0.8, 0.1, 0.1];
        let mut outputs = vec![grasp.clone(); 5];
        outputs.push(vec![0.5, 0.5]);
        outputs.push(grasp);
        let (mut pipeline, recorder) = scripted_pipeline(outputs);

        let total = WINDOW_SIZE + 5 * HOP_SIZE;
        let mut source = ReplaySource::from_readings(&readings(total));
        let outcomes = run(&mut pipeline, &mut source, total);

        assert_eq!(
            outcomes.last(),
            Some(&TickOutcome::Discarded(ClassifyError::MalformedOutput(2)))
        );
        assert_eq!(pipeline.stable().map(|s| s.label), Some(GestureLabel::Grasp));
        // The window still advanced by one hop
        assert_eq!(pipeline.buffer().len(), WINDOW_SIZE - HOP_SIZE);
        assert_eq!(recorder.calls(), vec![GestureLabel::Grasp]);
        assert_eq!(pipeline.telemetry().stats().malformed_outputs, 1);
    }

    #[test]
    fn test_backend_fallback_is_counted() {
        let (pipeline, _) = scripted_pipeline(vec![]);
        // Portable preference never attempts the accelerated backend
        assert_eq!(pipeline.telemetry().stats().backend_fallbacks, 0);

        let factory = ScriptedFactory(Arc::new(Mutex::new(VecDeque::new())));
        let classifier =
            Classifier::with_factory(&sample_model(), BackendPreference::Auto, &factory).unwrap();
        let pipeline = GesturePipeline::new(
            classifier,
            Standardizer::identity(),
            Thresholds::default(),
            Box::new(RecordingDispatcher::new()),
            create_shared_telemetry(),
        );
        assert_eq!(pipeline.telemetry().stats().backend_fallbacks, 1);
        assert!(pipeline.status().backend.fell_back());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (mut pipeline, _) = scripted_pipeline(vec![]);
        pipeline.shutdown();
        pipeline.shutdown();
        assert_eq!(pipeline.classifier().release_count(), 1);
        assert!(!pipeline.classifier().is_active());
    }

    #[test]
    fn test_tick_after_shutdown_discards() {
        let (mut pipeline, _) = scripted_pipeline(vec![]);
        pipeline.shutdown();
        let mut source = ReplaySource::from_readings(&readings(WINDOW_SIZE));

        let outcomes = run(&mut pipeline, &mut source, WINDOW_SIZE);
        assert_eq!(
            outcomes.last(),
            Some(&TickOutcome::Discarded(ClassifyError::Released))
        );
    }
}
