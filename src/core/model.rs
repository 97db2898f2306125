//! Pre-trained model artifact.
//!
//! The gesture network is trained offline and shipped as a JSON description
//! of a dense feed-forward network. Loading validates the declared tensor
//! names and shapes against the feature and class counts, and that the layer
//! dimensions chain. A model that fails validation cannot be run.

use crate::core::decision::NUM_CLASSES;
use crate::core::features::NUM_FEATURES;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional input tensor name.
pub const DEFAULT_INPUT_NAME: &str = "input";

/// Conventional output tensor name.
pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// Layer activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Softmax,
}

impl Activation {
    /// Apply the activation in place.
    pub fn apply(self, values: &mut [f32]) {
        match self {
            Activation::Linear => {}
            Activation::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
            Activation::Softmax => {
                let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let mut sum = 0.0;
                for v in values.iter_mut() {
                    *v = (*v - max).exp();
                    sum += *v;
                }
                if sum > 0.0 {
                    values.iter_mut().for_each(|v| *v /= sum);
                }
            }
        }
    }
}

/// One dense layer: `activation(weights · x + bias)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Row-major weights, one row per output unit
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    pub fn input_size(&self) -> usize {
        self.weights.first().map_or(0, |row| row.len())
    }

    pub fn output_size(&self) -> usize {
        self.weights.len()
    }
}

/// The offline-trained classifier network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default = "default_input_name")]
    pub input_name: String,
    #[serde(default = "default_output_name")]
    pub output_name: String,
    #[serde(default = "default_input_shape")]
    pub input_shape: [usize; 2],
    #[serde(default = "default_output_shape")]
    pub output_shape: [usize; 2],
    pub layers: Vec<DenseLayer>,
}

fn default_input_name() -> String {
    DEFAULT_INPUT_NAME.to_string()
}

fn default_output_name() -> String {
    DEFAULT_OUTPUT_NAME.to_string()
}

fn default_input_shape() -> [usize; 2] {
    [1, NUM_FEATURES]
}

fn default_output_shape() -> [usize; 2] {
    [1, NUM_CLASSES]
}

impl ModelArtifact {
    /// Build an artifact with conventional names and shapes.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self, ModelError> {
        let model = Self {
            input_name: default_input_name(),
            output_name: default_output_name(),
            input_shape: default_input_shape(),
            output_shape: default_output_shape(),
            layers,
        };
        model.validate()?;
        Ok(model)
    }

    /// Parse and validate an artifact from JSON.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: ModelArtifact =
            serde_json::from_str(json).map_err(|e| ModelError::Parse(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    /// Read and validate an artifact file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ModelError::Io(e.to_string()))?;
        let model = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            layers = model.layers.len(),
            "loaded model artifact"
        );
        Ok(model)
    }

    /// Check names, declared shapes and layer dimensions.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.input_name.is_empty() || self.output_name.is_empty() {
            return Err(ModelError::TensorName);
        }
        if self.input_shape != [1, NUM_FEATURES] {
            return Err(ModelError::Shape(format!(
                "input shape {:?}, expected [1, {NUM_FEATURES}]",
                self.input_shape
            )));
        }
        if self.output_shape != [1, NUM_CLASSES] {
            return Err(ModelError::Shape(format!(
                "output shape {:?}, expected [1, {NUM_CLASSES}]",
                self.output_shape
            )));
        }
        if self.layers.is_empty() {
            return Err(ModelError::Shape("model has no layers".to_string()));
        }

        let mut width = NUM_FEATURES;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.output_size() == 0 {
                return Err(ModelError::Shape(format!("layer {i} has no units")));
            }
            if layer.weights.iter().any(|row| row.len() != width) {
                return Err(ModelError::Shape(format!(
                    "layer {i} expects {} inputs, previous width is {width}",
                    layer.input_size()
                )));
            }
            if layer.bias.len() != layer.output_size() {
                return Err(ModelError::Shape(format!(
                    "layer {i} has {} biases for {} units",
                    layer.bias.len(),
                    layer.output_size()
                )));
            }
            width = layer.output_size();
        }

        if width != NUM_CLASSES {
            return Err(ModelError::Shape(format!(
                "final layer produces {width} values, expected {NUM_CLASSES}"
            )));
        }
        Ok(())
    }

    /// Total number of weights and biases.
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.output_size() * (l.input_size() + 1))
            .sum()
    }
}

/// Model artifact errors. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    Io(String),
    Parse(String),
    TensorName,
    Shape(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Io(e) => write!(f, "IO error: {e}"),
            ModelError::Parse(e) => write!(f, "Parse error: {e}"),
            ModelError::TensorName => write!(f, "model tensor names must not be empty"),
            ModelError::Shape(e) => write!(f, "Shape error: {e}"),
        }
    }
}

impl std::error::Error for ModelError {}
