//! Feature standardization with precomputed per-feature mean and scale.
//!
//! Parameters come from the offline training run as a JSON record
//! `{ "mean": [...], "scale": [...] }`. When the record is missing or
//! unusable the identity transform is substituted so the pipeline can still
//! run; callers log and count the fallback.

use crate::core::features::{FeatureVector, NUM_FEATURES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-feature standardization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl ScalerParams {
    /// Parameters that leave features unchanged.
    pub fn identity() -> Self {
        Self {
            mean: vec![0.0; NUM_FEATURES],
            scale: vec![1.0; NUM_FEATURES],
        }
    }

    /// Parse and validate parameters from JSON.
    pub fn from_json(json: &str) -> Result<Self, ScalerError> {
        let params: ScalerParams =
            serde_json::from_str(json).map_err(|e| ScalerError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Read parameters from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ScalerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ScalerError::Io(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Read parameters, substituting the identity transform on any failure.
    pub fn load_or_identity(path: Option<&Path>) -> LoadedScaler {
        let result = match path {
            Some(path) => Self::load(path),
            None => Err(ScalerError::Missing),
        };

        match result {
            Ok(params) => {
                tracing::info!(features = params.mean.len(), "loaded scaler parameters");
                LoadedScaler {
                    params,
                    fallback: None,
                }
            }
            Err(e) => {
                tracing::warn!("scaler parameters unavailable ({e}); using identity scaling");
                LoadedScaler {
                    params: Self::identity(),
                    fallback: Some(e),
                }
            }
        }
    }

    /// Check lengths and that every scale is usable as a divisor.
    pub fn validate(&self) -> Result<(), ScalerError> {
        if self.mean.len() != NUM_FEATURES || self.scale.len() != NUM_FEATURES {
            return Err(ScalerError::Length {
                mean: self.mean.len(),
                scale: self.scale.len(),
            });
        }
        if let Some(index) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(ScalerError::InvalidValue(index));
        }
        if let Some(index) = self
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(ScalerError::InvalidValue(index));
        }
        Ok(())
    }
}

/// Outcome of [`ScalerParams::load_or_identity`].
#[derive(Debug, Clone)]
pub struct LoadedScaler {
    pub params: ScalerParams,
    /// Why the identity transform was substituted, if it was
    pub fallback: Option<ScalerError>,
}

impl LoadedScaler {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Applies `(x - mean) / scale` per feature.
#[derive(Debug, Clone)]
pub struct Standardizer {
    params: ScalerParams,
}

impl Standardizer {
    pub fn new(params: ScalerParams) -> Result<Self, ScalerError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn identity() -> Self {
        Self {
            params: ScalerParams::identity(),
        }
    }

    pub fn params(&self) -> &ScalerParams {
        &self.params
    }

    /// Standardize a raw feature vector.
    pub fn standardize(&self, features: &FeatureVector) -> FeatureVector {
        let values = features
            .as_slice()
            .iter()
            .zip(self.params.mean.iter().zip(self.params.scale.iter()))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect();
        // Lengths are validated at construction
        FeatureVector::from_values(values).unwrap_or_else(|| features.clone())
    }

    /// Map standardized values back to raw feature space.
    pub fn inverse(&self, scaled: &FeatureVector) -> FeatureVector {
        let values = scaled
            .as_slice()
            .iter()
            .zip(self.params.mean.iter().zip(self.params.scale.iter()))
            .map(|(z, (mean, scale))| z * scale + mean)
            .collect();
        FeatureVector::from_values(values).unwrap_or_else(|| scaled.clone())
    }
}

/// Scaler parameter errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalerError {
    Missing,
    Io(String),
    Parse(String),
    Length { mean: usize, scale: usize },
    InvalidValue(usize),
}

impl std::fmt::Display for ScalerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalerError::Missing => write!(f, "no scaler parameters configured"),
            ScalerError::Io(e) => write!(f, "IO error: {e}"),
            ScalerError::Parse(e) => write!(f, "Parse error: {e}"),
            ScalerError::Length { mean, scale } => write!(
                f,
                "expected {NUM_FEATURES} mean/scale values, got {mean}/{scale}"
            ),
            ScalerError::InvalidValue(i) => {
                write!(f, "non-finite or zero scaler value at feature {i}")
            }
        }
    }
}

impl std::error::Error for ScalerError {}
