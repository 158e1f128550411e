use std::sync::Arc;
use std::time::Instant;

use tracing::{instrument, warn};
use vitrine_config::{ErrorCode, ExecutionMetadata, ExecutionResult, SourceConfig};

use crate::context::ExecutionContext;
use crate::executor::SourceExecutor;
use crate::registry::ExecutorRegistry;
use crate::transform::apply_transform;

/// Dispatches source configs to registered executors and normalizes results.
///
/// Never returns an error: unsupported kinds, invalid configs, and executor
/// failures all surface as failure [`ExecutionResult`]s with stable codes.
///
/// [`ExecutionResult`]: vitrine_config::ExecutionResult
#[derive(Default)]
pub struct UnifiedExecutor {
  registry: ExecutorRegistry,
}

impl UnifiedExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an executor for a kind. New kinds plug in here without any
  /// change to dispatch or to existing kinds.
  pub fn register(&self, kind: &str, executor: Arc<dyn SourceExecutor>) {
    self.registry.register(kind, executor);
  }

  /// Registered kinds, for diagnostics.
  pub fn kinds(&self) -> Vec<String> {
    self.registry.kinds()
  }

  #[instrument(
    name = "source_execute",
    skip(self, ctx, config),
    fields(widget_id = %ctx.widget_id, source_id = %config.source_id, kind = %config.kind)
  )]
  pub async fn execute(&self, ctx: &ExecutionContext, config: &SourceConfig) -> ExecutionResult {
    if let Err(e) = config.validate() {
      return ExecutionResult::failure(&config.source_id, ErrorCode::InvalidSourceConfig, e.to_string());
    }

    let Some(executor) = self.registry.get(&config.kind) else {
      return ExecutionResult::failure(
        &config.source_id,
        ErrorCode::UnsupportedSourceKind,
        format!("no executor registered for kind '{}'", config.kind),
      );
    };

    if !executor.validate(config) {
      return ExecutionResult::failure(
        &config.source_id,
        ErrorCode::InvalidSourceConfig,
        format!("executor for kind '{}' rejected the config", config.kind),
      );
    }

    let started = Instant::now();
    let mut result = executor.execute(ctx, config).await;

    // Post-processing runs here, once, for every kind.
    if result.success {
      if let (Some(transform), Some(data)) = (&config.transform, &result.data) {
        if !transform.is_identity() {
          match apply_transform(transform, data) {
            Ok(transformed) => result = result.with_data(transformed),
            Err(e) => {
              warn!(error = %e, "transform failed, keeping untransformed payload");
            }
          }
        }
      }
    }

    if result.metadata.is_none() {
      let byte_size = result
        .data
        .as_ref()
        .and_then(|d| serde_json::to_string(d).ok())
        .map(|s| s.len() as u64)
        .unwrap_or(0);
      result = result.with_metadata(ExecutionMetadata {
        response_time_ms: started.elapsed().as_millis() as u64,
        byte_size,
      });
    }

    result
  }
}
