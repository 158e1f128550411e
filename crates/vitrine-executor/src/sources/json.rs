use async_trait::async_trait;
use serde::Deserialize;
use vitrine_config::{kind, ErrorCode, ExecutionResult, SourceConfig};

use crate::context::ExecutionContext;
use crate::executor::SourceExecutor;

#[derive(Debug, Deserialize)]
struct JsonOptions {
  /// The raw JSON text to parse.
  content: String,
}

/// Parses a JSON string payload.
///
/// Malformed JSON yields a failure result with the parser's structured
/// message (line and column included), never an escaping error.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExecutor;

#[async_trait]
impl SourceExecutor for JsonExecutor {
  fn kind(&self) -> &str {
    kind::JSON
  }

  fn validate(&self, config: &SourceConfig) -> bool {
    serde_json::from_value::<JsonOptions>(config.options.clone()).is_ok()
  }

  async fn execute(&self, _ctx: &ExecutionContext, config: &SourceConfig) -> ExecutionResult {
    let options: JsonOptions = match serde_json::from_value(config.options.clone()) {
      Ok(options) => options,
      Err(e) => {
        return ExecutionResult::failure(
          &config.source_id,
          ErrorCode::InvalidSourceConfig,
          format!("json source requires a string 'content' option: {e}"),
        );
      }
    };

    match serde_json::from_str(&options.content) {
      Ok(data) => ExecutionResult::ok(&config.source_id, data),
      Err(e) => ExecutionResult::failure(
        &config.source_id,
        ErrorCode::ParseFailure,
        format!("invalid JSON payload: {e}"),
      ),
    }
  }
}
