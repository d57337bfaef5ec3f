//! Engine configuration.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```yaml
//! languages: [java, python]
//! patterns:
//!   disabled: [LongMethod]
//! similarity:
//!   default_threshold: 0.75
//! parse:
//!   max_concurrency: 8
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::languages::{builtin_adapter, BUILTIN_LANGUAGES};
use crate::patterns::BUILTIN_MATCHERS;
use crate::similarity::DEFAULT_THRESHOLD;

/// Validation failures for an [`EngineConfig`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
    #[error("similarity threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f64),
    #[error("unknown pattern matcher: {0}")]
    UnknownMatcher(String),
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Built-in adapters to register.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default)]
    pub patterns: PatternsConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub parse: ParseConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            patterns: PatternsConfig::default(),
            similarity: SimilarityConfig::default(),
            parse: ParseConfig::default(),
        }
    }
}

fn default_languages() -> Vec<String> {
    BUILTIN_LANGUAGES.iter().map(|l| l.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct PatternsConfig {
    /// Matcher names left out of the registry.
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimilarityConfig {
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParseConfig {
    /// Upper bound on parses in flight during a batch.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_max_concurrency() -> usize {
    16
}

impl EngineConfig {
    /// Parse and validate a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        // serde_yaml reads an empty document as null, not as an empty map
        let config: EngineConfig = if text.trim().is_empty() {
            EngineConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(language) = self
            .languages
            .iter()
            .find(|l| builtin_adapter(l).is_none())
        {
            return Err(ConfigError::UnknownLanguage(language.clone()));
        }
        let threshold = self.similarity.default_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        if let Some(name) = self
            .patterns
            .disabled
            .iter()
            .find(|n| !BUILTIN_MATCHERS.contains(&n.as_str()))
        {
            return Err(ConfigError::UnknownMatcher(name.clone()));
        }
        if self.parse.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}
