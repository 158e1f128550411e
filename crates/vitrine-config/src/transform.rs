use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Comparison operator for predicate filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
  Eq,
  Ne,
  Gt,
  Lt,
  Contains,
}

/// One predicate applied to array elements: keep elements whose `field`
/// compares against `value` under `op`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
  pub field: String,
  pub op: FilterOp,
  pub value: serde_json::Value,
}

/// Declarative post-processing applied after an executor succeeds.
///
/// Steps run in order: extract, then rename, then filter. Each step is a
/// no-op when unset, so an empty transform is the identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
  /// Dot-separated path into the payload, e.g. `"data.items"`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub extract_path: Option<String>,

  /// Top-level key renames, old name to new name.
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub rename: HashMap<String, String>,

  /// Keep only array elements matching the rule.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filter: Option<FilterRule>,
}

impl TransformConfig {
  /// Whether this transform would change any payload.
  pub fn is_identity(&self) -> bool {
    self.extract_path.is_none() && self.rename.is_empty() && self.filter.is_none()
  }
}
