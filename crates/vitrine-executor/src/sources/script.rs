use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use vitrine_config::{kind, ErrorCode, ExecutionResult, SourceConfig};

use crate::context::ExecutionContext;
use crate::executor::SourceExecutor;
use crate::sandbox::ScriptSandbox;

#[derive(Debug, Deserialize)]
struct ScriptOptions {
  code: String,
  #[serde(default)]
  context: Value,
}

/// Runs user code in the external sandbox and returns whatever it produces.
pub struct ScriptExecutor {
  sandbox: Arc<dyn ScriptSandbox>,
}

impl ScriptExecutor {
  pub fn new(sandbox: Arc<dyn ScriptSandbox>) -> Self {
    Self { sandbox }
  }
}

#[async_trait]
impl SourceExecutor for ScriptExecutor {
  fn kind(&self) -> &str {
    kind::SCRIPT
  }

  fn validate(&self, config: &SourceConfig) -> bool {
    serde_json::from_value::<ScriptOptions>(config.options.clone()).is_ok()
  }

  async fn execute(&self, ctx: &ExecutionContext, config: &SourceConfig) -> ExecutionResult {
    let options: ScriptOptions = match serde_json::from_value(config.options.clone()) {
      Ok(options) => options,
      Err(e) => {
        return ExecutionResult::failure(
          &config.source_id,
          ErrorCode::InvalidSourceConfig,
          format!("script source requires a string 'code' option: {e}"),
        );
      }
    };

    let context = serde_json::json!({
      "widgetId": ctx.widget_id,
      "sourceId": config.source_id,
      "context": options.context,
    });

    let outcome = self.sandbox.execute_script(&options.code, &context).await;
    if outcome.success {
      ExecutionResult::ok(&config.source_id, outcome.data.unwrap_or(Value::Null))
    } else {
      ExecutionResult::failure(
        &config.source_id,
        ErrorCode::ScriptFailure,
        outcome
          .error
          .unwrap_or_else(|| "script failed without a message".to_string()),
      )
    }
  }
}
