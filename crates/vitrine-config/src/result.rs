use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable error codes carried by failure results.
///
/// Codes, not messages, are what callers branch on; messages are for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
  /// No executor is registered for the config's kind.
  UnsupportedSourceKind,
  /// The config failed structural or kind-specific validation.
  InvalidSourceConfig,
  /// Network error or non-success HTTP status.
  TransportFailure,
  /// The per-request timeout elapsed.
  Timeout,
  /// The payload could not be parsed.
  ParseFailure,
  /// The scripting sandbox reported a failure.
  ScriptFailure,
  /// The execution was cancelled before completion.
  Cancelled,
}

impl std::fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Self::UnsupportedSourceKind => "UNSUPPORTED_SOURCE_KIND",
      Self::InvalidSourceConfig => "INVALID_SOURCE_CONFIG",
      Self::TransportFailure => "TRANSPORT_FAILURE",
      Self::Timeout => "TIMEOUT",
      Self::ParseFailure => "PARSE_FAILURE",
      Self::ScriptFailure => "SCRIPT_FAILURE",
      Self::Cancelled => "CANCELLED",
    };
    f.write_str(s)
  }
}

/// Why an execution failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFailure {
  pub code: ErrorCode,
  pub message: String,
}

impl std::fmt::Display for ExecutionFailure {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}: {}", self.code, self.message)
  }
}

/// Measurements taken while producing a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionMetadata {
  pub response_time_ms: u64,
  pub byte_size: u64,
}

/// The outcome of executing one source. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
  pub success: bool,
  pub source_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<ExecutionFailure>,
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<ExecutionMetadata>,
}

impl ExecutionResult {
  /// A successful result carrying `data`.
  pub fn ok(source_id: impl Into<String>, data: serde_json::Value) -> Self {
    Self {
      success: true,
      source_id: source_id.into(),
      data: Some(data),
      error: None,
      timestamp: Utc::now(),
      metadata: None,
    }
  }

  /// A failure result with a stable code and a log-friendly message.
  pub fn failure(source_id: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
    Self {
      success: false,
      source_id: source_id.into(),
      data: None,
      error: Some(ExecutionFailure {
        code,
        message: message.into(),
      }),
      timestamp: Utc::now(),
      metadata: None,
    }
  }

  /// Attach measurements.
  pub fn with_metadata(mut self, metadata: ExecutionMetadata) -> Self {
    self.metadata = Some(metadata);
    self
  }

  /// Replace the payload, keeping everything else.
  pub fn with_data(mut self, data: serde_json::Value) -> Self {
    self.data = Some(data);
    self
  }
}
