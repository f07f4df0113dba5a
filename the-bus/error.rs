use thiserror::Error;

/// Why a call through the bus did not run.
///
/// Every variant is raised before the callee is invoked, so a failed call has
/// no side effects and performs no write-back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
  #[error("no binding registered under key '{key}'")]
  UnknownKey { key: String },

  #[error("binding '{key}' takes arguments {expected}, call supplied {found}")]
  ArgumentMismatch {
    key:      String,
    expected: &'static str,
    found:    &'static str,
  },

  #[error("binding '{key}' returns {declared}, caller expected {requested}")]
  ReturnMismatch {
    key:       String,
    declared:  &'static str,
    requested: &'static str,
  },

  #[error("binding '{key}' returns {declared} but the caller supplied no return slot")]
  MissingReturnSlot { key: String, declared: &'static str },

  #[error("receiver bound under key '{key}' has been dropped")]
  ReceiverDropped { key: String },
}

impl CallError {
  /// The key the failed call targeted.
  pub fn key(&self) -> &str {
    match self {
      Self::UnknownKey { key }
      | Self::ArgumentMismatch { key, .. }
      | Self::ReturnMismatch { key, .. }
      | Self::MissingReturnSlot { key, .. }
      | Self::ReceiverDropped { key } => key,
    }
  }
}

pub type Result<T> = std::result::Result<T, CallError>;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid bus configuration: {0}")]
  Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_messages_name_the_key() {
    let err = CallError::UnknownKey { key: "sq".into() };
    assert_eq!(err.to_string(), "no binding registered under key 'sq'");
    assert_eq!(err.key(), "sq");

    let err = CallError::ArgumentMismatch {
      key:      "add".into(),
      expected: "(i32, i32)",
      found:    "(i64, i64)",
    };
    assert_eq!(
      err.to_string(),
      "binding 'add' takes arguments (i32, i32), call supplied (i64, i64)"
    );
    assert_eq!(err.key(), "add");
  }
}
