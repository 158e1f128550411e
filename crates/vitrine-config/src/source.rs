use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::transform::TransformConfig;

/// Well-known source kind identifiers.
///
/// The executor registry is keyed by plain strings so new kinds can be plugged
/// in without touching this crate; these constants only name the built-ins.
pub mod kind {
  pub const STATIC: &str = "static";
  pub const HTTP: &str = "http";
  pub const JSON: &str = "json";
  pub const WEBSOCKET: &str = "websocket";
  pub const SCRIPT: &str = "script";
}

/// One data source declared by a widget.
///
/// The `options` blob is kind-specific and is deserialized by whichever
/// executor handles `kind` (e.g. URL/method/params for HTTP, a literal payload
/// for static sources).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
  /// Unique within the owning widget.
  pub source_id: String,

  /// Executor registry key, e.g. `"http"`.
  pub kind: String,

  /// Kind-specific configuration, opaque to the dispatcher.
  #[serde(default)]
  pub options: serde_json::Value,

  /// Post-processing applied uniformly after any executor succeeds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub transform: Option<TransformConfig>,

  /// Cache TTL override for results of this source, in milliseconds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ttl_ms: Option<u64>,

  /// Disabled sources are skipped entirely by the bridge.
  #[serde(default = "default_enabled")]
  pub enabled: bool,
}

fn default_enabled() -> bool {
  true
}

impl SourceConfig {
  /// Create a minimal source config with the given id, kind, and options.
  pub fn new(
    source_id: impl Into<String>,
    kind: impl Into<String>,
    options: serde_json::Value,
  ) -> Self {
    Self {
      source_id: source_id.into(),
      kind: kind.into(),
      options,
      transform: None,
      ttl_ms: None,
      enabled: true,
    }
  }

  /// Structural validation shared by all kinds.
  ///
  /// Kind-specific option validation belongs to the executor that owns the
  /// kind; this only checks the fields the dispatcher itself relies on.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.source_id.is_empty() {
      return Err(ConfigError::MissingField {
        field: "source_id".to_string(),
      });
    }
    if self.kind.is_empty() {
      return Err(ConfigError::MissingField {
        field: "kind".to_string(),
      });
    }
    Ok(())
  }
}
