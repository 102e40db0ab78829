//! Guardrail configuration.
//!
//! All routing thresholds are configurable policy, loaded once at
//! process start and treated as read-only afterwards. The defaults
//! match the shipped business rules.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    ValidationError(String),
}

/// Thresholds driving the business rule engine and the
/// confidence/status mismatch check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum confidence for any automatic routing
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Claims below this amount qualify for the fast path
    #[serde(default = "default_fast_track_amount")]
    pub fast_track_amount: f64,

    /// Confidence required for the fast path
    #[serde(default = "default_fast_track_confidence")]
    pub fast_track_confidence: f64,

    /// Claims below this amount qualify for moderate-value approval
    #[serde(default = "default_moderate_amount")]
    pub moderate_amount: f64,

    /// Claims above this amount always go to manual review
    #[serde(default = "default_high_value_amount")]
    pub high_value_amount: f64,

    /// Confidence considered suspiciously high for a deferring status
    #[serde(default = "default_very_high_confidence")]
    pub very_high_confidence: f64,

    /// Confidence considered suspiciously low for a definitive status
    #[serde(default = "default_very_low_confidence")]
    pub very_low_confidence: f64,
}

fn default_min_confidence() -> f64 {
    0.85
}

fn default_fast_track_amount() -> f64 {
    500.0
}

fn default_fast_track_confidence() -> f64 {
    0.90
}

fn default_moderate_amount() -> f64 {
    1000.0
}

fn default_high_value_amount() -> f64 {
    5000.0
}

fn default_very_high_confidence() -> f64 {
    0.95
}

fn default_very_low_confidence() -> f64 {
    0.40
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            fast_track_amount: default_fast_track_amount(),
            fast_track_confidence: default_fast_track_confidence(),
            moderate_amount: default_moderate_amount(),
            high_value_amount: default_high_value_amount(),
            very_high_confidence: default_very_high_confidence(),
            very_low_confidence: default_very_low_confidence(),
        }
    }
}

/// Top-level guardrail configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Routing and mismatch thresholds
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl GuardrailConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: GuardrailConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Validate threshold ranges and ordering.
    fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;

        for (name, value) in [
            ("min_confidence", t.min_confidence),
            ("fast_track_confidence", t.fast_track_confidence),
            ("very_high_confidence", t.very_high_confidence),
            ("very_low_confidence", t.very_low_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [
            ("fast_track_amount", t.fast_track_amount),
            ("moderate_amount", t.moderate_amount),
            ("high_value_amount", t.high_value_amount),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be a positive amount, got {}",
                    name, value
                )));
            }
        }

        if t.fast_track_amount > t.moderate_amount {
            return Err(ConfigError::ValidationError(
                "fast_track_amount must not exceed moderate_amount".to_string(),
            ));
        }
        if t.moderate_amount > t.high_value_amount {
            return Err(ConfigError::ValidationError(
                "moderate_amount must not exceed high_value_amount".to_string(),
            ));
        }
        if t.very_low_confidence >= t.very_high_confidence {
            return Err(ConfigError::ValidationError(
                "very_low_confidence must be below very_high_confidence".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardrailConfig::default();
        assert_eq!(config.thresholds.min_confidence, 0.85);
        assert_eq!(config.thresholds.high_value_amount, 5000.0);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = GuardrailConfig::from_yaml(
            r#"
thresholds:
  min_confidence: 0.80
"#,
        )
        .unwrap();

        assert_eq!(config.thresholds.min_confidence, 0.80);
        assert_eq!(config.thresholds.fast_track_amount, 500.0);
    }

    #[test]
    fn test_rejects_out_of_range_confidence() {
        let result = GuardrailConfig::from_yaml(
            r#"
thresholds:
  min_confidence: 1.5
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_inverted_amounts() {
        let result = GuardrailConfig::from_yaml(
            r#"
thresholds:
  moderate_amount: 9000.0
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
