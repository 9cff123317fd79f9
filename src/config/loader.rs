//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ConfigSnapshot;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

impl From<Vec<ValidationError>> for ConfigError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ConfigError::Validation(errors)
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a file.
///
/// `.yaml` and `.yml` files are read as YAML, anything else as TOML.
pub fn load_config(path: &Path) -> Result<ConfigSnapshot, ConfigError> {
    let content = fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );

    let config = if is_yaml {
        parse_yaml(&content)?
    } else {
        parse_toml(&content)?
    };

    validate_config(&config)?;
    Ok(config)
}

/// Parse a TOML document without validating it.
pub fn parse_toml(content: &str) -> Result<ConfigSnapshot, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Parse a YAML document without validating it.
pub fn parse_yaml(content: &str) -> Result<ConfigSnapshot, ConfigError> {
    serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}
