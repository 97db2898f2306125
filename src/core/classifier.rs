//! Gesture classifier with backend selection.
//!
//! At startup the classifier tries the accelerated backend and falls back to
//! the portable one if that fails; the fallback is a warning, never fatal.
//! Each call is stateless. Outputs are checked before they leave this module:
//! anything other than three finite values is an error for that call only.
//!
//! The backend handle is released exactly once, either by an explicit
//! [`Classifier::shutdown`] or on drop.

use crate::core::decision::{ProbabilityDistribution, NUM_CLASSES};
use crate::core::features::{FeatureVector, NUM_FEATURES};
use crate::core::model::{DenseLayer, ModelArtifact};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Execution engine kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Accelerated,
    Portable,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Accelerated => f.write_str("accelerated"),
            BackendKind::Portable => f.write_str("portable"),
        }
    }
}

/// Which backend to try first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Accelerated, falling back to portable
    #[default]
    Auto,
    /// Same order as `Auto`; stated explicitly in configuration
    Accelerated,
    /// Skip the accelerated backend
    Portable,
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(BackendPreference::Auto),
            "accelerated" | "gpu" => Ok(BackendPreference::Accelerated),
            "portable" | "cpu" => Ok(BackendPreference::Portable),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// A loaded model bound to an execution engine.
pub trait InferenceBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Run one forward pass over a `(1, NUM_FEATURES)` input.
    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, BackendError>;

    /// Free engine resources. Called at most once.
    fn release(&mut self) {}
}

/// Creates backends for a model.
pub trait BackendFactory {
    fn accelerated(&self, model: &ModelArtifact)
        -> Result<Box<dyn InferenceBackend>, BackendError>;

    fn portable(&self, model: &ModelArtifact) -> Result<Box<dyn InferenceBackend>, BackendError>;
}

/// Factory for the backends compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    #[cfg(feature = "accelerated")]
    fn accelerated(
        &self,
        model: &ModelArtifact,
    ) -> Result<Box<dyn InferenceBackend>, BackendError> {
        Ok(Box::new(accelerated::AcceleratedBackend::new(model)?))
    }

    #[cfg(not(feature = "accelerated"))]
    fn accelerated(
        &self,
        _model: &ModelArtifact,
    ) -> Result<Box<dyn InferenceBackend>, BackendError> {
        Err(BackendError::Unavailable(
            "built without the accelerated feature".to_string(),
        ))
    }

    fn portable(&self, model: &ModelArtifact) -> Result<Box<dyn InferenceBackend>, BackendError> {
        Ok(Box::new(PortableBackend::new(model)))
    }
}

/// Straightforward dense forward pass over nested vectors.
#[derive(Debug, Clone)]
pub struct PortableBackend {
    layers: Vec<DenseLayer>,
}

impl PortableBackend {
    pub fn new(model: &ModelArtifact) -> Self {
        Self {
            layers: model.layers.clone(),
        }
    }
}

impl InferenceBackend for PortableBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Portable
    }

    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, BackendError> {
        let mut activations = input.to_vec();
        for layer in &self.layers {
            if activations.len() != layer.input_size() {
                return Err(BackendError::Execution(format!(
                    "layer expects {} inputs, got {}",
                    layer.input_size(),
                    activations.len()
                )));
            }
            let mut next: Vec<f32> = layer
                .weights
                .iter()
                .zip(layer.bias.iter())
                .map(|(row, bias)| {
                    row.iter()
                        .zip(activations.iter())
                        .map(|(w, x)| w * x)
                        .sum::<f32>()
                        + bias
                })
                .collect();
            layer.activation.apply(&mut next);
            activations = next;
        }
        Ok(activations)
    }
}

#[cfg(feature = "accelerated")]
mod accelerated {
    use super::{BackendError, BackendKind, InferenceBackend};
    use crate::core::model::{Activation, ModelArtifact};
    use ndarray::{Array1, Array2};

    /// Dense layers compiled into contiguous matrices.
    pub struct AcceleratedBackend {
        layers: Vec<(Array2<f32>, Array1<f32>, Activation)>,
    }

    impl AcceleratedBackend {
        pub fn new(model: &ModelArtifact) -> Result<Self, BackendError> {
            let mut layers = Vec::with_capacity(model.layers.len());
            for layer in &model.layers {
                let flat: Vec<f32> = layer.weights.iter().flatten().copied().collect();
                let weights =
                    Array2::from_shape_vec((layer.output_size(), layer.input_size()), flat)
                        .map_err(|e| BackendError::Init(e.to_string()))?;
                let bias = Array1::from(layer.bias.clone());
                layers.push((weights, bias, layer.activation));
            }
            Ok(Self { layers })
        }
    }

    impl InferenceBackend for AcceleratedBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Accelerated
        }

        fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, BackendError> {
            let mut x = Array1::from(input.to_vec());
            for (weights, bias, activation) in &self.layers {
                if weights.ncols() != x.len() {
                    return Err(BackendError::Execution(format!(
                        "layer expects {} inputs, got {}",
                        weights.ncols(),
                        x.len()
                    )));
                }
                let mut y = weights.dot(&x) + bias;
                let values = y.as_slice_mut().ok_or_else(|| {
                    BackendError::Execution("non-contiguous activation buffer".to_string())
                })?;
                activation.apply(values);
                x = y;
            }
            Ok(x.to_vec())
        }

        fn release(&mut self) {
            self.layers.clear();
        }
    }
}

/// Which backend was selected at startup, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSelection {
    pub selected: BackendKind,
    /// Reason the accelerated backend was not used, when it was attempted
    pub fallback_reason: Option<String>,
}

impl BackendSelection {
    pub fn fell_back(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Stateless gesture scorer.
pub struct Classifier {
    backend: Option<Box<dyn InferenceBackend>>,
    selection: BackendSelection,
    input_name: String,
    output_name: String,
    releases: usize,
}

impl Classifier {
    /// Create a classifier using the built-in backends.
    pub fn new(model: &ModelArtifact, preference: BackendPreference) -> Result<Self, BackendError> {
        Self::with_factory(model, preference, &DefaultBackendFactory)
    }

    /// Create a classifier, selecting a backend from `factory`.
    ///
    /// Fails only if the portable backend cannot be created either.
    pub fn with_factory(
        model: &ModelArtifact,
        preference: BackendPreference,
        factory: &dyn BackendFactory,
    ) -> Result<Self, BackendError> {
        let mut fallback_reason = None;

        let accelerated = match preference {
            BackendPreference::Portable => None,
            BackendPreference::Auto | BackendPreference::Accelerated => {
                match factory.accelerated(model) {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        tracing::warn!("accelerated backend failed: {e}; falling back to portable");
                        fallback_reason = Some(e.to_string());
                        None
                    }
                }
            }
        };

        let backend = match accelerated {
            Some(backend) => backend,
            None => factory.portable(model)?,
        };

        let selection = BackendSelection {
            selected: backend.kind(),
            fallback_reason,
        };
        tracing::info!(backend = %selection.selected, "initialized inference backend");

        Ok(Self {
            backend: Some(backend),
            selection,
            input_name: model.input_name.clone(),
            output_name: model.output_name.clone(),
            releases: 0,
        })
    }

    /// Score a standardized feature vector.
    pub fn classify(
        &mut self,
        features: &FeatureVector,
    ) -> Result<ProbabilityDistribution, ClassifyError> {
        let backend = self.backend.as_mut().ok_or(ClassifyError::Released)?;

        if features.len() != NUM_FEATURES {
            return Err(ClassifyError::InputLength(features.len()));
        }
        let input: Vec<f32> = features.as_slice().iter().map(|&v| v as f32).collect();

        let output = backend.run(&input).map_err(ClassifyError::Backend)?;
        if output.len() != NUM_CLASSES {
            return Err(ClassifyError::MalformedOutput(output.len()));
        }
        if output.iter().any(|p| !p.is_finite()) {
            return Err(ClassifyError::NonFinite);
        }

        ProbabilityDistribution::from_slice(&output)
            .ok_or(ClassifyError::MalformedOutput(output.len()))
    }

    pub fn selection(&self) -> &BackendSelection {
        &self.selection
    }

    pub fn tensor_names(&self) -> (&str, &str) {
        (&self.input_name, &self.output_name)
    }

    /// Whether the backend is still held.
    pub fn is_active(&self) -> bool {
        self.backend.is_some()
    }

    /// Number of times a backend handle was released (0 or 1).
    pub fn release_count(&self) -> usize {
        self.releases
    }

    /// Release the backend. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.release();
            self.releases += 1;
            tracing::info!(backend = %backend.kind(), "released inference backend");
        }
    }
}

impl Drop for Classifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("selection", &self.selection)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Backend creation and execution errors.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    Unavailable(String),
    Init(String),
    Execution(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unavailable(e) => write!(f, "backend unavailable: {e}"),
            BackendError::Init(e) => write!(f, "backend initialization failed: {e}"),
            BackendError::Execution(e) => write!(f, "backend execution failed: {e}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Per-call classification errors. The tick's result is discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyError {
    InputLength(usize),
    MalformedOutput(usize),
    NonFinite,
    Backend(BackendError),
    Released,
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::InputLength(n) => {
                write!(f, "expected {NUM_FEATURES} input features, got {n}")
            }
            ClassifyError::MalformedOutput(n) => {
                write!(f, "expected {NUM_CLASSES} output values, got {n}")
            }
            ClassifyError::NonFinite => write!(f, "model output contains non-finite values"),
            ClassifyError::Backend(e) => write!(f, "{e}"),
            ClassifyError::Released => write!(f, "classifier backend already released"),
        }
    }
}

impl std::error::Error for ClassifyError {}
