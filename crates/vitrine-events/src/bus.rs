use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::{BoxFuture, join_all};
use thiserror::Error;
use tracing::{debug, error};

use crate::event::ConfigEvent;
use crate::filter::EventFilter;

/// A failure reported by an event handler.
///
/// Handlers are isolated: this is logged by the bus, never propagated to the
/// emitter or to sibling handlers.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
  pub message: String,
}

impl HandlerError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// Receives events of one subscribed type.
#[async_trait]
pub trait EventHandler: Send + Sync {
  async fn handle(&self, event: &ConfigEvent) -> Result<(), HandlerError>;
}

/// Adapter turning an async closure into an [`EventHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
  F: Fn(ConfigEvent) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync,
{
  async fn handle(&self, event: &ConfigEvent) -> Result<(), HandlerError> {
    (self.0)(event.clone()).await
  }
}

/// Identifies one subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct HandlerEntry {
  id: SubscriptionId,
  handler: Arc<dyn EventHandler>,
}

/// The configuration-change event bus.
///
/// Cheap to share: wrap it in an `Arc` and hand clones to producers and
/// consumers alike.
pub struct ConfigEventBus {
  handlers: RwLock<HashMap<String, Vec<HandlerEntry>>>,
  filters: RwLock<Vec<Arc<dyn EventFilter>>>,
  next_id: AtomicU64,
}

impl Default for ConfigEventBus {
  fn default() -> Self {
    Self::new()
  }
}

impl ConfigEventBus {
  pub fn new() -> Self {
    Self {
      handlers: RwLock::new(HashMap::new()),
      filters: RwLock::new(Vec::new()),
      next_id: AtomicU64::new(1),
    }
  }

  /// Subscribe a handler to one event type. Returns an id for [`off`].
  ///
  /// [`off`]: ConfigEventBus::off
  pub fn on(&self, event_type: &str, handler: Arc<dyn EventHandler>) -> SubscriptionId {
    let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
    let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
    handlers
      .entry(event_type.to_string())
      .or_default()
      .push(HandlerEntry { id, handler });
    id
  }

  /// Remove a subscription. Returns whether anything was removed.
  pub fn off(&self, event_type: &str, id: SubscriptionId) -> bool {
    let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
    let Some(entries) = handlers.get_mut(event_type) else {
      return false;
    };
    let before = entries.len();
    entries.retain(|entry| entry.id != id);
    before != entries.len()
  }

  /// Register a global delivery filter.
  pub fn add_filter(&self, filter: Arc<dyn EventFilter>) {
    let mut filters = self.filters.write().unwrap_or_else(|e| e.into_inner());
    filters.push(filter);
    // Descending priority; emission iterates in order.
    filters.sort_by_key(|f| std::cmp::Reverse(f.priority()));
  }

  /// Emit an event: filter, fan out by derived type, await all handlers.
  ///
  /// Each handler failure is logged and swallowed so one consumer cannot
  /// block or fail the rest.
  pub async fn emit(&self, event: ConfigEvent) {
    if !self.accepts(&event) {
      debug!(
        event_id = %event.event_id,
        widget_id = %event.widget_id,
        "event vetoed by filter"
      );
      return;
    }

    // Snapshot the matching handlers so no lock is held across awaits.
    let matched: Vec<Arc<dyn EventHandler>> = {
      let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
      event
        .event_types()
        .iter()
        .filter_map(|event_type| handlers.get(*event_type))
        .flatten()
        .map(|entry| entry.handler.clone())
        .collect()
    };

    if matched.is_empty() {
      return;
    }

    let outcomes = join_all(matched.iter().map(|handler| handler.handle(&event))).await;
    for outcome in outcomes {
      if let Err(e) = outcome {
        error!(
          event_id = %event.event_id,
          widget_id = %event.widget_id,
          error = %e,
          "event handler failed"
        );
      }
    }
  }

  fn accepts(&self, event: &ConfigEvent) -> bool {
    let filters = self.filters.read().unwrap_or_else(|e| e.into_inner());
    filters.iter().all(|filter| filter.accept(event))
  }
}
