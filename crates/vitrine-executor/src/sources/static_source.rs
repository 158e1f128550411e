use async_trait::async_trait;
use vitrine_config::{kind, ExecutionResult, SourceConfig};

use crate::context::ExecutionContext;
use crate::executor::SourceExecutor;

/// Returns the configured literal verbatim.
///
/// Options: `{ "value": <any JSON> }`. When no `value` field is present the
/// whole options object is treated as the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticExecutor;

#[async_trait]
impl SourceExecutor for StaticExecutor {
  fn kind(&self) -> &str {
    kind::STATIC
  }

  async fn execute(&self, _ctx: &ExecutionContext, config: &SourceConfig) -> ExecutionResult {
    let data = config
      .options
      .get("value")
      .cloned()
      .unwrap_or_else(|| config.options.clone());
    ExecutionResult::ok(&config.source_id, data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn returns_the_embedded_literal() {
    let executor = StaticExecutor;
    let ctx = ExecutionContext::new("w1");
    let config = SourceConfig::new("s1", kind::STATIC, json!({"value": {"temp": 22.5}}));

    let result = executor.execute(&ctx, &config).await;
    assert!(result.success);
    assert_eq!(result.data, Some(json!({"temp": 22.5})));
  }

  #[tokio::test]
  async fn falls_back_to_whole_options() {
    let executor = StaticExecutor;
    let ctx = ExecutionContext::new("w1");
    let config = SourceConfig::new("s1", kind::STATIC, json!({"temp": 1}));

    let result = executor.execute(&ctx, &config).await;
    assert_eq!(result.data, Some(json!({"temp": 1})));
  }
}
