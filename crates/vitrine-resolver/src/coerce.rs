use serde_json::Value;
use vitrine_config::ParamDataType;

/// Coerce a resolved value to its declared data type.
///
/// This conversion is total: input that cannot be converted degrades to a
/// type-appropriate zero value (0, false, empty string, null) instead of
/// raising an error.
pub fn coerce(value: Value, data_type: ParamDataType) -> Value {
  match data_type {
    ParamDataType::String => coerce_string(value),
    ParamDataType::Number => coerce_number(value),
    ParamDataType::Boolean => coerce_boolean(value),
    ParamDataType::Json => coerce_json(value),
  }
}

fn coerce_string(value: Value) -> Value {
  match value {
    Value::String(s) => Value::String(s),
    Value::Null => Value::String(String::new()),
    other => Value::String(other.to_string()),
  }
}

fn coerce_number(value: Value) -> Value {
  let n = match &value {
    Value::Number(n) => n.as_f64().unwrap_or(0.0),
    Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
    Value::Bool(true) => 1.0,
    _ => 0.0,
  };
  // NaN and infinities degrade to 0 rather than producing invalid JSON.
  let n = if n.is_finite() { n } else { 0.0 };
  serde_json::Number::from_f64(n)
    .map(Value::Number)
    .unwrap_or(Value::Number(0.into()))
}

fn coerce_boolean(value: Value) -> Value {
  let b = match &value {
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
    Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
    _ => false,
  };
  Value::Bool(b)
}

fn coerce_json(value: Value) -> Value {
  match value {
    // A string payload is parsed; unparseable strings stay as strings.
    Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
    other => other,
  }
}

/// Render a resolved value as the string form used in URLs and headers.
///
/// Strings are used verbatim (no surrounding quotes); everything else is the
/// compact JSON representation.
pub fn render(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn number_coercion_is_total() {
    assert_eq!(coerce(json!("42.5"), ParamDataType::Number), json!(42.5));
    assert_eq!(coerce(json!("not a number"), ParamDataType::Number), json!(0.0));
    assert_eq!(coerce(json!(null), ParamDataType::Number), json!(0.0));
    assert_eq!(coerce(json!(true), ParamDataType::Number), json!(1.0));
    assert_eq!(coerce(json!({"a": 1}), ParamDataType::Number), json!(0.0));
  }

  #[test]
  fn boolean_coercion_accepts_common_spellings() {
    assert_eq!(coerce(json!("true"), ParamDataType::Boolean), json!(true));
    assert_eq!(coerce(json!("YES"), ParamDataType::Boolean), json!(true));
    assert_eq!(coerce(json!(0), ParamDataType::Boolean), json!(false));
    assert_eq!(coerce(json!("off"), ParamDataType::Boolean), json!(false));
  }

  #[test]
  fn json_coercion_parses_embedded_strings() {
    assert_eq!(
      coerce(json!("{\"a\": 1}"), ParamDataType::Json),
      json!({"a": 1})
    );
    assert_eq!(coerce(json!("plain"), ParamDataType::Json), json!("plain"));
  }

  #[test]
  fn render_strips_quotes_from_strings() {
    assert_eq!(render(&json!("abc")), "abc");
    assert_eq!(render(&json!(7)), "7");
    assert_eq!(render(&json!([1, 2])), "[1,2]");
  }
}
