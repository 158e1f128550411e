use serde::{Deserialize, Serialize};

/// Where a resolved parameter is placed in the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
  /// Substituted into `{placeholder}` tokens in the URL path.
  Path,
  /// Appended to the query string.
  Query,
  /// Merged into the request headers.
  Header,
}

/// Declared type a parameter value is coerced to before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamDataType {
  String,
  Number,
  Boolean,
  Json,
}

impl Default for ParamDataType {
  fn default() -> Self {
    Self::String
  }
}

/// A declared request parameter.
///
/// Exactly one of `value` (a literal) or `binding` (a `widgetId.propertyPath`
/// reference to another widget's live property) supplies the raw value; when
/// both are present the binding wins. Resolution never mutates the parameter -
/// it produces a fresh value, or nothing at all when the parameter should be
/// omitted from the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
  pub key: String,

  pub location: ParamLocation,

  /// Literal value.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<serde_json::Value>,

  /// Cross-widget binding, `"widgetId.property.path"`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub binding: Option<String>,

  /// Fallback used when the literal/bound value is empty.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_value: Option<serde_json::Value>,

  #[serde(default)]
  pub data_type: ParamDataType,

  #[serde(default = "default_enabled")]
  pub enabled: bool,
}

fn default_enabled() -> bool {
  true
}

impl Parameter {
  /// Create an enabled literal parameter.
  pub fn literal(
    key: impl Into<String>,
    location: ParamLocation,
    value: serde_json::Value,
  ) -> Self {
    Self {
      key: key.into(),
      location,
      value: Some(value),
      binding: None,
      default_value: None,
      data_type: ParamDataType::default(),
      enabled: true,
    }
  }

  /// Create an enabled bound parameter.
  pub fn bound(key: impl Into<String>, location: ParamLocation, binding: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      location,
      value: None,
      binding: Some(binding.into()),
      default_value: None,
      data_type: ParamDataType::default(),
      enabled: true,
    }
  }
}
