//! Runtime configuration: per-stage timeouts for external calls.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading runtime configuration.
#[derive(Error, Debug)]
pub enum RuntimeConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("invalid duration for {field}: {source}")]
    InvalidDuration {
        field: &'static str,
        source: humantime::DurationError,
    },
}

/// Per-stage timeouts applied at every external-call boundary.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Embedding + retrieval budget
    pub retrieval_timeout: Duration,

    /// Generation budget
    pub generation_timeout: Duration,

    /// Supporting-document extraction budget
    pub extraction_timeout: Duration,

    /// Audit write budget
    pub audit_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            retrieval_timeout: Duration::from_secs(10),
            generation_timeout: Duration::from_secs(30),
            extraction_timeout: Duration::from_secs(10),
            audit_timeout: Duration::from_secs(5),
        }
    }
}

/// On-disk shape: durations as humantime strings ("30s", "2m").
#[derive(Debug, Deserialize)]
struct RuntimeConfigFile {
    #[serde(default)]
    retrieval_timeout: Option<String>,

    #[serde(default)]
    generation_timeout: Option<String>,

    #[serde(default)]
    extraction_timeout: Option<String>,

    #[serde(default)]
    audit_timeout: Option<String>,
}

impl RuntimeConfig {
    /// Parse configuration from a YAML string; absent fields keep defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuntimeConfigError> {
        let file: RuntimeConfigFile = serde_yaml::from_str(yaml)?;
        let defaults = Self::default();

        Ok(Self {
            retrieval_timeout: parse_or(file.retrieval_timeout, "retrieval_timeout", defaults.retrieval_timeout)?,
            generation_timeout: parse_or(file.generation_timeout, "generation_timeout", defaults.generation_timeout)?,
            extraction_timeout: parse_or(file.extraction_timeout, "extraction_timeout", defaults.extraction_timeout)?,
            audit_timeout: parse_or(file.audit_timeout, "audit_timeout", defaults.audit_timeout)?,
        })
    }

    /// Parse configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RuntimeConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

fn parse_or(
    value: Option<String>,
    field: &'static str,
    default: Duration,
) -> Result<Duration, RuntimeConfigError> {
    match value {
        Some(s) => humantime::parse_duration(&s)
            .map_err(|source| RuntimeConfigError::InvalidDuration { field, source }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.generation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_parse_humantime_strings() {
        let config = RuntimeConfig::from_yaml(
            r#"
retrieval_timeout: "5s"
generation_timeout: "1m"
"#,
        )
        .unwrap();

        assert_eq!(config.retrieval_timeout, Duration::from_secs(5));
        assert_eq!(config.generation_timeout, Duration::from_secs(60));
        assert_eq!(config.audit_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let result = RuntimeConfig::from_yaml("generation_timeout: \"soon\"\n");
        assert!(matches!(
            result,
            Err(RuntimeConfigError::InvalidDuration { .. })
        ));
    }
}
