use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use vitrine_config::{ParamLocation, Parameter};

use crate::coerce::{coerce, render};
use crate::lookup::WidgetLookup;

/// Parameters resolved for one request, split by destination.
///
/// Skipped parameters are simply absent; consumers must not synthesize empty
/// values for missing keys.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResolvedParams {
  pub path: Vec<(String, String)>,
  pub query: Vec<(String, String)>,
  pub headers: Vec<(String, String)>,
}

impl ResolvedParams {
  pub fn is_empty(&self) -> bool {
    self.path.is_empty() && self.query.is_empty() && self.headers.is_empty()
  }
}

/// Resolves declared parameters against live widget state.
#[derive(Clone)]
pub struct ParameterResolver {
  lookup: Arc<dyn WidgetLookup>,
}

impl ParameterResolver {
  pub fn new(lookup: Arc<dyn WidgetLookup>) -> Self {
    Self { lookup }
  }

  /// Resolve one parameter. `None` means the parameter is skipped entirely.
  pub fn resolve(&self, param: &Parameter) -> Option<Value> {
    if !param.enabled {
      return None;
    }

    // A binding wins over a literal when both are configured.
    let raw = match &param.binding {
      Some(binding) => self.resolve_binding(binding),
      None => param.value.clone(),
    };

    let raw = match raw {
      Some(value) if !is_empty(&value) => value,
      _ => match &param.default_value {
        Some(default) if !is_empty(default) => default.clone(),
        _ => {
          debug!(key = %param.key, "parameter unresolved and has no default, skipping");
          return None;
        }
      },
    };

    Some(coerce(raw, param.data_type))
  }

  /// Resolve a full parameter list, bucketed by location.
  pub fn resolve_all(&self, params: &[Parameter]) -> ResolvedParams {
    let mut resolved = ResolvedParams::default();
    for param in params {
      let Some(value) = self.resolve(param) else {
        continue;
      };
      let rendered = render(&value);
      match param.location {
        ParamLocation::Path => resolved.path.push((param.key.clone(), rendered)),
        ParamLocation::Query => resolved.query.push((param.key.clone(), rendered)),
        ParamLocation::Header => resolved.headers.push((param.key.clone(), rendered)),
      }
    }
    resolved
  }

  /// Look up a `widgetId.propertyPath` reference.
  fn resolve_binding(&self, binding: &str) -> Option<Value> {
    let (widget_id, property_path) = binding.split_once('.')?;
    if widget_id.is_empty() || property_path.is_empty() {
      return None;
    }
    self.lookup.live_property(widget_id, property_path)
  }
}

/// Emptiness as the resolution rules see it: null, missing, or blank string.
fn is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.trim().is_empty(),
    _ => false,
  }
}
