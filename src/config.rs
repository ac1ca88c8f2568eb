//! Generation settings
//!
//! [`GenerateConfig`] is the builder passed to the library entry points.
//! [`Settings`] is its TOML file form, read by the command line tool:
//!
//! ```toml
//! name = "ResNet18"
//! max_depth = 32
//!
//! [params]
//! NUM = 64
//! DEPTH = 2
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::block::DEFAULT_MAX_DEPTH;
use crate::params::ParameterSet;

/// Name used when neither the settings nor the root file name the model
pub const DEFAULT_MODEL_NAME: &str = "DefaultNet";

/// Configuration for a generation run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateConfig {
    /// Global parameters; they win over the root file's declared params
    pub params: ParameterSet,
    /// Model name used when the root file declares none
    pub default_name: String,
    /// Maximum composite nesting depth
    pub max_depth: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            params: ParameterSet::new(),
            default_name: DEFAULT_MODEL_NAME.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl GenerateConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the global parameters
    pub fn with_params(mut self, params: ParameterSet) -> Self {
        self.params = params;
        self
    }

    /// Set a single global parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Errors that can occur when loading settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Parameter '{0}' must be a string, number or boolean")]
    InvalidParam(String),
}

/// Settings file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub name: Option<String>,
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub params: toml::Table,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// Log filter directive, e.g. `info` or `protogen=debug`
    pub level: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load settings from a TOML string
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Convert into a generation config; parameters keep file order
    pub fn into_config(self) -> Result<GenerateConfig, SettingsError> {
        let mut config = GenerateConfig::new();
        if let Some(name) = self.name {
            config = config.with_default_name(name);
        }
        if let Some(max_depth) = self.max_depth {
            config = config.with_max_depth(max_depth);
        }
        for (key, value) in self.params {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(n) => n.to_string(),
                toml::Value::Float(x) => x.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                _ => return Err(SettingsError::InvalidParam(key)),
            };
            config = config.with_param(key, value);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GenerateConfig::default();
        assert_eq!(config.default_name, "DefaultNet");
        assert_eq!(config.max_depth, 64);
        assert!(config.params.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = GenerateConfig::new()
            .with_param("NUM", "32")
            .with_default_name("Net")
            .with_max_depth(4);
        assert_eq!(config.params.get("NUM"), Some("32"));
        assert_eq!(config.default_name, "Net");
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn test_parse_settings() {
        let settings = Settings::from_str(
            r#"
name = "ResNet18"
max_depth = 8

[params]
NUM = 64
SCALE = 0.5
BIAS = true
MODE = "train"

[logging]
level = "debug"
"#,
        )
        .expect("Should parse");
        assert_eq!(settings.logging.level.as_deref(), Some("debug"));

        let config = settings.into_config().expect("Should convert");
        assert_eq!(config.default_name, "ResNet18");
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.params.get("NUM"), Some("64"));
        assert_eq!(config.params.get("SCALE"), Some("0.5"));
        assert_eq!(config.params.get("BIAS"), Some("true"));
        assert_eq!(config.params.get("MODE"), Some("train"));
    }

    #[test]
    fn test_empty_settings() {
        let config = Settings::from_str("").unwrap().into_config().unwrap();
        assert_eq!(config, GenerateConfig::default());
    }

    #[test]
    fn test_nested_param_is_rejected() {
        let settings = Settings::from_str("[params]\nLIST = [1, 2]\n").unwrap();
        assert!(matches!(
            settings.into_config(),
            Err(SettingsError::InvalidParam(name)) if name == "LIST"
        ));
    }

    #[test]
    fn test_invalid_toml_error() {
        assert!(matches!(
            Settings::from_str("name = "),
            Err(SettingsError::ParseError(_))
        ));
    }
}
