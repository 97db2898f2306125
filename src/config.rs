//! Configuration for the EMG gesture agent.

use crate::core::classifier::BackendPreference;
use crate::core::decision::Thresholds;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the gesture agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decision policy thresholds
    pub thresholds: Thresholds,

    /// Time between pipeline ticks
    #[serde(with = "duration_serde")]
    pub tick_interval: Duration,

    /// Trained model artifact
    pub model_path: Option<PathBuf>,

    /// Standardization parameters; identity scaling is used when absent
    pub scaler_path: Option<PathBuf>,

    /// Which inference backend to try first
    pub backend: BackendPreference,

    /// Path for storing the session telemetry
    pub data_path: PathBuf,

    /// Pending feedback commands held for the actuator driver
    pub feedback_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emg-gesture-agent");

        Self {
            thresholds: Thresholds::default(),
            tick_interval: Duration::from_millis(14), // ~70 Hz armband
            model_path: None,
            scaler_path: None,
            backend: BackendPreference::Auto,
            data_path: data_dir,
            feedback_capacity: 16,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emg-gesture-agent")
            .join("config.json")
    }

    /// Where `run` writes the session telemetry.
    pub fn telemetry_path(&self) -> PathBuf {
        self.data_path.join("telemetry.json")
    }

    /// Reject thresholds outside [0, 1] and a zero tick interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((name, value)) = self.thresholds.first_invalid() {
            return Err(ConfigError::InvalidThreshold { name, value });
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidTickInterval);
        }
        Ok(())
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidThreshold { name: &'static str, value: f32 },
    InvalidTickInterval,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidThreshold { name, value } => {
                write!(f, "{name} threshold {value} is outside [0, 1]")
            }
            ConfigError::InvalidTickInterval => write!(f, "tick interval must be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration, in milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
