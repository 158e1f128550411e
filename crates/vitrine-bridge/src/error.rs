use thiserror::Error;

/// Hard failures at the bridge boundary.
///
/// Per-source failures are not errors; they are carried inside the widget
/// result. These variants cover the only cases where widget-level execution
/// itself fails.
#[derive(Debug, Error)]
pub enum BridgeError {
  /// The requirement is structurally invalid (missing widget id, duplicate
  /// source ids, ...).
  #[error("invalid requirement: {0}")]
  InvalidRequirement(#[from] vitrine_config::ConfigError),

  /// The execution was cancelled before completion.
  #[error("widget execution cancelled")]
  Cancelled,

  /// A spawned source task could not be joined.
  #[error("source task join error: {message}")]
  Join { message: String },
}
