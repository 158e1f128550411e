//! Pipeline execution events, for observability.
//!
//! The bridge emits these as a widget execution progresses. Consumers decide
//! what to do with them (log, persist, stream to a UI); the bridge itself
//! never blocks on a notifier.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during widget execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
  /// A widget execution has started.
  WidgetStarted {
    execution_id: String,
    widget_id: String,
    sources: usize,
  },

  /// One source finished successfully.
  SourceCompleted {
    execution_id: String,
    widget_id: String,
    source_id: String,
  },

  /// One source failed; the rest of the widget continues.
  SourceFailed {
    execution_id: String,
    widget_id: String,
    source_id: String,
    error: String,
  },

  /// The widget execution finished (regardless of per-source outcomes).
  WidgetCompleted {
    execution_id: String,
    widget_id: String,
  },
}

/// Trait for receiving pipeline events.
pub trait PipelineNotifier: Send + Sync {
  fn notify(&self, event: PipelineEvent);
}

impl<T: PipelineNotifier + ?Sized> PipelineNotifier for Arc<T> {
  fn notify(&self, event: PipelineEvent) {
    (**self).notify(event)
  }
}

/// Discards all events. The default for bridges that are not observed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl PipelineNotifier for NoopNotifier {
  fn notify(&self, _event: PipelineEvent) {
    // Intentionally empty
  }
}

/// Sends events to an unbounded channel for asynchronous consumption.
///
/// Unbounded so a slow consumer cannot stall execution; event volume is one
/// per source start/finish, so growth is bounded in practice.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<PipelineEvent>) -> Self {
    Self { sender }
  }
}

impl PipelineNotifier for ChannelNotifier {
  fn notify(&self, event: PipelineEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
