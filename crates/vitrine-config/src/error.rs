use thiserror::Error;

/// Errors raised when validating configuration before execution.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// A required field is missing or empty.
  #[error("missing required field: {field}")]
  MissingField { field: String },

  /// Two sources in one requirement share an id.
  #[error("duplicate source id: {source_id}")]
  DuplicateSourceId { source_id: String },

  /// Kind-specific options failed to deserialize.
  #[error("invalid options for kind '{kind}': {message}")]
  InvalidOptions { kind: String, message: String },
}
