use tokio_util::sync::CancellationToken;

/// Ambient information for one source execution.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
  /// The widget this execution feeds.
  pub widget_id: String,
  /// Cooperative cancellation for the whole widget execution.
  pub cancel: CancellationToken,
}

impl ExecutionContext {
  pub fn new(widget_id: impl Into<String>) -> Self {
    Self {
      widget_id: widget_id.into(),
      cancel: CancellationToken::new(),
    }
  }

  pub fn with_cancel(widget_id: impl Into<String>, cancel: CancellationToken) -> Self {
    Self {
      widget_id: widget_id.into(),
      cancel,
    }
  }
}
