use async_trait::async_trait;
use vitrine_config::{ExecutionResult, SourceConfig};

use crate::context::ExecutionContext;

/// The uniform contract every source kind implements.
///
/// Implementations must convert every internal failure into a failure
/// [`ExecutionResult`]; nothing may escape this boundary as an `Err` or a
/// panic. The dispatcher relies on that to keep one source's failure from
/// taking down a multi-source fetch.
#[async_trait]
pub trait SourceExecutor: Send + Sync {
  /// The registry key this executor serves, e.g. `"http"`.
  fn kind(&self) -> &str;

  /// Cheap structural check run before `execute`. Kind-specific.
  fn validate(&self, _config: &SourceConfig) -> bool {
    true
  }

  async fn execute(&self, ctx: &ExecutionContext, config: &SourceConfig) -> ExecutionResult;
}
