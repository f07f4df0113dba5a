//! Bus configuration.

use serde::Deserialize;

use crate::error::ConfigError;

/// What a failed call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
  /// Return the [`CallError`](crate::CallError) to the caller.
  #[default]
  Return,
  /// Panic with the error message. Use when every key is registered during a
  /// fixed startup phase and a failed call can only be a programming error.
  Panic,
}

/// ```toml
/// call-errors = "panic"
/// capacity = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BusConfig {
  pub call_errors: ErrorPolicy,
  /// Initial capacity of the binding map.
  pub capacity:    usize,
}

impl BusConfig {
  pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(source)?)
  }

  pub fn with_call_errors(mut self, policy: ErrorPolicy) -> Self {
    self.call_errors = policy;
    self
  }

  pub fn with_capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }
}
