use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use vitrine_config::{kind, ErrorCode, ExecutionResult, SourceConfig};

use crate::context::ExecutionContext;
use crate::executor::SourceExecutor;

#[derive(Debug, Deserialize)]
struct WebSocketOptions {
  url: String,
}

/// Acknowledges a websocket source with an immediate "connecting" result.
///
/// The pipeline's execute path is pull-based; push updates from the live
/// connection are delivered out-of-band by the transport collaborator, which
/// writes each incoming message into the warehouse for this widget/source.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketExecutor;

#[async_trait]
impl SourceExecutor for WebSocketExecutor {
  fn kind(&self) -> &str {
    kind::WEBSOCKET
  }

  fn validate(&self, config: &SourceConfig) -> bool {
    serde_json::from_value::<WebSocketOptions>(config.options.clone()).is_ok()
  }

  async fn execute(&self, _ctx: &ExecutionContext, config: &SourceConfig) -> ExecutionResult {
    let options: WebSocketOptions = match serde_json::from_value(config.options.clone()) {
      Ok(options) => options,
      Err(e) => {
        return ExecutionResult::failure(
          &config.source_id,
          ErrorCode::InvalidSourceConfig,
          format!("websocket source requires a string 'url' option: {e}"),
        );
      }
    };

    ExecutionResult::ok(
      &config.source_id,
      json!({ "status": "connecting", "url": options.url }),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn reports_connecting_immediately() {
    let executor = WebSocketExecutor;
    let ctx = ExecutionContext::new("w1");
    let config = SourceConfig::new("s1", kind::WEBSOCKET, json!({"url": "wss://example/live"}));

    let result = executor.execute(&ctx, &config).await;
    assert!(result.success);
    assert_eq!(result.data.unwrap()["status"], "connecting");
  }
}
