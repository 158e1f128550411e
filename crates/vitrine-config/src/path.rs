/// Walk a dot-separated path into a JSON value.
///
/// Array elements can be addressed by numeric segments, e.g. `"items.0.name"`.
/// Returns `None` as soon as any segment is absent.
pub fn value_at_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
  let mut current = value;
  for segment in path.split('.').filter(|s| !s.is_empty()) {
    current = match current {
      serde_json::Value::Object(map) => map.get(segment)?,
      serde_json::Value::Array(items) => {
        let index: usize = segment.parse().ok()?;
        items.get(index)?
      }
      _ => return None,
    };
  }
  Some(current)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn walks_objects_and_arrays() {
    let value = json!({"data": {"items": [{"name": "a"}, {"name": "b"}]}});
    assert_eq!(
      value_at_path(&value, "data.items.1.name"),
      Some(&json!("b"))
    );
  }

  #[test]
  fn missing_segment_yields_none() {
    let value = json!({"data": {}});
    assert_eq!(value_at_path(&value, "data.missing.deeper"), None);
  }

  #[test]
  fn empty_path_returns_root() {
    let value = json!({"a": 1});
    assert_eq!(value_at_path(&value, ""), Some(&value));
  }
}
