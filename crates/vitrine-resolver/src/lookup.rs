use std::collections::HashMap;
use std::sync::RwLock;

/// Live widget property lookup, implemented by the host application.
///
/// The resolver asks this for the current value behind a cross-widget binding.
/// Returning `None` means the widget or property does not exist right now;
/// the resolver then falls back to the parameter's default.
pub trait WidgetLookup: Send + Sync {
  fn live_property(&self, widget_id: &str, property_path: &str) -> Option<serde_json::Value>;
}

/// A lookup over a plain map of widget state, keyed by widget id.
///
/// Suitable for tests and for hosts that mirror widget state into the
/// pipeline explicitly rather than exposing their own registry.
#[derive(Debug, Default)]
pub struct StaticWidgetLookup {
  widgets: RwLock<HashMap<String, serde_json::Value>>,
}

impl StaticWidgetLookup {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the state object for a widget.
  pub fn set_widget(&self, widget_id: impl Into<String>, state: serde_json::Value) {
    let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());
    widgets.insert(widget_id.into(), state);
  }

  /// Remove a widget's state entirely.
  pub fn remove_widget(&self, widget_id: &str) {
    let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());
    widgets.remove(widget_id);
  }
}

impl WidgetLookup for StaticWidgetLookup {
  fn live_property(&self, widget_id: &str, property_path: &str) -> Option<serde_json::Value> {
    let widgets = self.widgets.read().unwrap_or_else(|e| e.into_inner());
    let state = widgets.get(widget_id)?;
    vitrine_config::value_at_path(state, property_path).cloned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn looks_up_nested_property() {
    let lookup = StaticWidgetLookup::new();
    lookup.set_widget("w1", json!({"selection": {"device": "dev-42"}}));

    assert_eq!(
      lookup.live_property("w1", "selection.device"),
      Some(json!("dev-42"))
    );
    assert_eq!(lookup.live_property("w1", "selection.missing"), None);
    assert_eq!(lookup.live_property("w2", "selection.device"), None);
  }
}
