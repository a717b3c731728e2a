//! Runtime limits and collector policy.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which values a collection treats as directly reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootSet {
    /// Argument stack, global namespace, and the code and context of every
    /// active frame.
    #[default]
    Machine,
    /// Argument stack only. The namespace record is kept but its entries are
    /// not traced.
    ArgumentStack,
}

/// Configuration for a [`crate::Vm`].
///
/// Fields are only reachable through the validating builders and loaders,
/// so every instance carries non-zero limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    max_stack_size: usize,
    max_call_depth: usize,
    roots: RootSet,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_stack_size: 65_536,
            max_call_depth: 4_096,
            roots: RootSet::Machine,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("reading configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_stack_size(mut self, limit: usize) -> Result<Self, ConfigError> {
        self.max_stack_size = limit;
        self.validate()
    }

    pub fn with_max_call_depth(mut self, limit: usize) -> Result<Self, ConfigError> {
        self.max_call_depth = limit;
        self.validate()
    }

    /// Maximum number of values on the argument stack.
    pub fn max_stack_size(&self) -> usize {
        self.max_stack_size
    }

    /// Maximum number of active frames.
    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    pub fn roots(&self) -> RootSet {
        self.roots
    }

    pub fn with_roots(mut self, roots: RootSet) -> Self {
        self.roots = roots;
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()
    }

    /// Loads a TOML file; absent keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_stack_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_stack_size must be greater than zero".into(),
            ));
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_call_depth must be greater than zero".into(),
            ));
        }
        Ok(self)
    }
}
