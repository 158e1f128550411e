use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fired for every configuration change, regardless of section.
pub const CONFIG_CHANGED: &str = "config-changed";

/// Fired when the data-source section of a widget's configuration changed.
pub const DATA_SOURCE_CHANGED: &str = "data-source-changed";

/// Which part of a widget's configuration changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigSection {
  /// Source declarations: the pipeline cares about these.
  DataSource,
  /// Core widget settings (title, type).
  Base,
  /// Visual component properties.
  Component,
  /// Cross-widget interaction wiring.
  Interaction,
}

impl ConfigSection {
  /// The section-specific event type fired alongside [`CONFIG_CHANGED`].
  pub fn event_type(&self) -> &'static str {
    match self {
      Self::DataSource => DATA_SOURCE_CHANGED,
      Self::Base => "base-changed",
      Self::Component => "component-changed",
      Self::Interaction => "interaction-changed",
    }
  }
}

/// A configuration-change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEvent {
  pub event_id: String,
  pub widget_id: String,
  pub section: ConfigSection,
  /// Section-specific payload; for data-source changes this carries the new
  /// source declarations so consumers can re-execute without a round trip.
  #[serde(default)]
  pub payload: serde_json::Value,
  pub timestamp: DateTime<Utc>,
}

impl ConfigEvent {
  pub fn new(
    widget_id: impl Into<String>,
    section: ConfigSection,
    payload: serde_json::Value,
  ) -> Self {
    Self {
      event_id: uuid::Uuid::new_v4().to_string(),
      widget_id: widget_id.into(),
      section,
      payload,
      timestamp: Utc::now(),
    }
  }

  /// The concrete event types this event fires, most specific first.
  pub fn event_types(&self) -> [&'static str; 2] {
    [self.section.event_type(), CONFIG_CHANGED]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn data_source_section_fires_both_types() {
    let event = ConfigEvent::new("w1", ConfigSection::DataSource, json!({}));
    assert_eq!(event.event_types(), [DATA_SOURCE_CHANGED, CONFIG_CHANGED]);
  }

  #[test]
  fn section_serializes_camel_case() {
    let event = ConfigEvent::new("w1", ConfigSection::DataSource, json!(null));
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["section"], "dataSource");
  }
}
