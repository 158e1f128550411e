use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::source::SourceConfig;

/// Everything a widget wants fetched: its identity plus the declared sources.
///
/// This is the unit of work handed to the data bridge. Source ids must be
/// unique within the requirement; the merged result is keyed by them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRequirement {
  pub widget_id: String,
  #[serde(default)]
  pub sources: Vec<SourceConfig>,
}

impl DataRequirement {
  pub fn new(widget_id: impl Into<String>, sources: Vec<SourceConfig>) -> Self {
    Self {
      widget_id: widget_id.into(),
      sources,
    }
  }

  /// Structural validation: the bridge treats a failure here as a hard error,
  /// unlike per-source failures which are isolated.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.widget_id.is_empty() {
      return Err(ConfigError::MissingField {
        field: "widget_id".to_string(),
      });
    }
    let mut seen = std::collections::HashSet::new();
    for source in &self.sources {
      source.validate()?;
      if !seen.insert(source.source_id.as_str()) {
        return Err(ConfigError::DuplicateSourceId {
          source_id: source.source_id.clone(),
        });
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn validate_rejects_duplicate_source_ids() {
    let requirement = DataRequirement::new(
      "w1",
      vec![
        SourceConfig::new("s1", "static", json!({"value": 1})),
        SourceConfig::new("s1", "static", json!({"value": 2})),
      ],
    );
    assert!(matches!(
      requirement.validate(),
      Err(ConfigError::DuplicateSourceId { .. })
    ));
  }

  #[test]
  fn validate_rejects_missing_widget_id() {
    let requirement = DataRequirement::new("", vec![]);
    assert!(requirement.validate().is_err());
  }
}
