use serde_json::Value;
use thiserror::Error;
use vitrine_config::{value_at_path, FilterOp, FilterRule, TransformConfig};

/// Why a transform could not be applied. The dispatcher logs this and falls
/// back to the untransformed payload.
#[derive(Debug, Error)]
pub enum TransformError {
  #[error("extract path '{path}' not found in payload")]
  PathNotFound { path: String },

  #[error("rename requires an object payload, got {actual}")]
  NotAnObject { actual: &'static str },
}

/// Apply a declarative transform: extract, then rename, then filter.
pub fn apply_transform(transform: &TransformConfig, data: &Value) -> Result<Value, TransformError> {
  let mut current = match &transform.extract_path {
    Some(path) => value_at_path(data, path)
      .cloned()
      .ok_or_else(|| TransformError::PathNotFound { path: path.clone() })?,
    None => data.clone(),
  };

  if !transform.rename.is_empty() {
    let Value::Object(map) = &mut current else {
      return Err(TransformError::NotAnObject {
        actual: type_name(&current),
      });
    };
    for (old, new) in &transform.rename {
      if let Some(value) = map.remove(old) {
        map.insert(new.clone(), value);
      }
    }
  }

  if let Some(rule) = &transform.filter {
    if let Value::Array(items) = &mut current {
      items.retain(|item| matches_rule(item, rule));
    }
    // Non-array payloads pass through a filter unchanged.
  }

  Ok(current)
}

fn matches_rule(item: &Value, rule: &FilterRule) -> bool {
  let Some(field) = value_at_path(item, &rule.field) else {
    return false;
  };
  match rule.op {
    FilterOp::Eq => field == &rule.value,
    FilterOp::Ne => field != &rule.value,
    FilterOp::Gt => compare(field, &rule.value).is_some_and(|o| o.is_gt()),
    FilterOp::Lt => compare(field, &rule.value).is_some_and(|o| o.is_lt()),
    FilterOp::Contains => contains(field, &rule.value),
  }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
  match (a, b) {
    (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
    _ => None,
  }
}

fn contains(field: &Value, needle: &Value) -> bool {
  match (field, needle) {
    (Value::String(haystack), Value::String(s)) => haystack.contains(s.as_str()),
    (Value::Array(items), needle) => items.contains(needle),
    _ => false,
  }
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::collections::HashMap;

  #[test]
  fn extract_then_rename() {
    let transform = TransformConfig {
      extract_path: Some("data.reading".to_string()),
      rename: HashMap::from([("t".to_string(), "temperature".to_string())]),
      filter: None,
    };
    let payload = json!({"data": {"reading": {"t": 21.0, "unit": "C"}}});

    let out = apply_transform(&transform, &payload).unwrap();
    assert_eq!(out, json!({"temperature": 21.0, "unit": "C"}));
  }

  #[test]
  fn missing_extract_path_is_an_error() {
    let transform = TransformConfig {
      extract_path: Some("nope".to_string()),
      ..Default::default()
    };
    assert!(matches!(
      apply_transform(&transform, &json!({"data": 1})),
      Err(TransformError::PathNotFound { .. })
    ));
  }

  #[test]
  fn filter_keeps_matching_elements() {
    let transform = TransformConfig {
      filter: Some(FilterRule {
        field: "value".to_string(),
        op: FilterOp::Gt,
        value: json!(10),
      }),
      ..Default::default()
    };
    let payload = json!([{"value": 5}, {"value": 15}, {"value": 25}]);

    let out = apply_transform(&transform, &payload).unwrap();
    assert_eq!(out, json!([{"value": 15}, {"value": 25}]));
  }

  #[test]
  fn filter_on_non_array_is_a_noop() {
    let transform = TransformConfig {
      filter: Some(FilterRule {
        field: "value".to_string(),
        op: FilterOp::Eq,
        value: json!(1),
      }),
      ..Default::default()
    };
    let payload = json!({"value": 1});
    assert_eq!(apply_transform(&transform, &payload).unwrap(), payload);
  }
}
