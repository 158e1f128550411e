use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vitrine_config::{DataRequirement, ExecutionResult};
use vitrine_executor::{ExecutionContext, UnifiedExecutor};
use vitrine_warehouse::{DataWarehouse, StoreOptions};

use crate::error::BridgeError;
use crate::events::{NoopNotifier, PipelineEvent, PipelineNotifier};
use crate::listener::{DataUpdateListener, ListenerId};

/// The outcome of one widget execution.
#[derive(Debug, Clone)]
pub struct WidgetResult {
  pub widget_id: String,
  pub execution_id: String,
  /// Merged object keyed by source id; failed sources hold `null`.
  pub data: Value,
  /// Failure messages keyed by source id, for the sources that hold `null`.
  pub errors: HashMap<String, String>,
  /// Whether the result was served from the warehouse without executing.
  pub from_cache: bool,
}

/// Orchestrates one widget's sources through the executor and into the
/// warehouse.
pub struct DataBridge<N: PipelineNotifier = NoopNotifier> {
  warehouse: Arc<DataWarehouse>,
  executor: Arc<UnifiedExecutor>,
  listeners: RwLock<Vec<(ListenerId, Arc<dyn DataUpdateListener>)>>,
  next_listener_id: AtomicU64,
  notifier: N,
}

impl DataBridge<NoopNotifier> {
  pub fn new(warehouse: Arc<DataWarehouse>, executor: Arc<UnifiedExecutor>) -> Self {
    Self::with_notifier(warehouse, executor, NoopNotifier)
  }
}

impl<N: PipelineNotifier> DataBridge<N> {
  pub fn with_notifier(
    warehouse: Arc<DataWarehouse>,
    executor: Arc<UnifiedExecutor>,
    notifier: N,
  ) -> Self {
    Self {
      warehouse,
      executor,
      listeners: RwLock::new(Vec::new()),
      next_listener_id: AtomicU64::new(1),
      notifier,
    }
  }

  /// Register a listener invoked after every fresh execution with the merged
  /// widget data.
  pub fn on_data_update(&self, listener: Arc<dyn DataUpdateListener>) -> ListenerId {
    let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
    self
      .listeners
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .push((id, listener));
    id
  }

  pub fn remove_listener(&self, id: ListenerId) {
    self
      .listeners
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .retain(|(lid, _)| *lid != id);
  }

  /// Read the merged view for a widget straight from the warehouse.
  pub fn get_component_data(&self, widget_id: &str) -> Option<Arc<Value>> {
    self.warehouse.get(widget_id)
  }

  /// Execute every enabled source of a requirement.
  ///
  /// Cache-first: when the warehouse holds a live merged view the bridge
  /// returns it without touching any executor. Otherwise sources run in
  /// parallel; each claims its version token before it starts, so writes
  /// landing out of order resolve in favor of the later start.
  pub async fn execute_widget(
    &self,
    requirement: &DataRequirement,
    cancel: CancellationToken,
  ) -> Result<WidgetResult, BridgeError> {
    requirement.validate()?;
    let widget_id = requirement.widget_id.clone();

    if let Some(cached) = self.warehouse.get(&widget_id) {
      debug!(widget_id = %widget_id, "serving widget from cache");
      return Ok(WidgetResult {
        widget_id,
        execution_id: String::new(),
        data: (*cached).clone(),
        errors: HashMap::new(),
        from_cache: true,
      });
    }

    let execution_id = Uuid::new_v4().to_string();
    let enabled: Vec<_> = requirement.sources.iter().filter(|s| s.enabled).collect();
    info!(
      widget_id = %widget_id,
      execution_id = %execution_id,
      sources = enabled.len(),
      "executing widget"
    );
    self.notifier.notify(PipelineEvent::WidgetStarted {
      execution_id: execution_id.clone(),
      widget_id: widget_id.clone(),
      sources: enabled.len(),
    });

    let mut handles = Vec::with_capacity(enabled.len());
    for source in &enabled {
      // Claim the token now: a slow fetch that started before a later one
      // must lose the warehouse race even if it finishes last.
      let version = self.warehouse.next_version(&widget_id);
      let ttl = source.ttl_ms.map(Duration::from_millis);
      let config = (*source).clone();
      let executor = self.executor.clone();
      let ctx = ExecutionContext::with_cancel(&widget_id, cancel.child_token());
      handles.push(tokio::spawn(async move {
        let result = executor.execute(&ctx, &config).await;
        (config.source_id, config.kind, version, ttl, result)
      }));
    }

    let joined = tokio::select! {
      joined = join_all(handles) => joined,
      _ = cancel.cancelled() => {
        info!(widget_id = %widget_id, execution_id = %execution_id, "widget execution cancelled");
        return Err(BridgeError::Cancelled);
      }
    };

    let mut data = serde_json::Map::new();
    let mut errors = HashMap::new();
    for outcome in joined {
      let (source_id, kind, version, ttl, result) = outcome.map_err(|e| BridgeError::Join {
        message: e.to_string(),
      })?;
      self.record_source(
        &widget_id,
        &execution_id,
        &source_id,
        &kind,
        version,
        ttl,
        result,
        &mut data,
        &mut errors,
      );
    }

    let merged = Value::Object(data);
    {
      let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
      for (_, listener) in listeners.iter() {
        listener.on_data_update(&widget_id, &merged);
      }
    }

    self.notifier.notify(PipelineEvent::WidgetCompleted {
      execution_id: execution_id.clone(),
      widget_id: widget_id.clone(),
    });

    Ok(WidgetResult {
      widget_id,
      execution_id,
      data: merged,
      errors,
      from_cache: false,
    })
  }

  #[allow(clippy::too_many_arguments)]
  fn record_source(
    &self,
    widget_id: &str,
    execution_id: &str,
    source_id: &str,
    kind: &str,
    version: u64,
    ttl: Option<Duration>,
    result: ExecutionResult,
    data: &mut serde_json::Map<String, Value>,
    errors: &mut HashMap<String, String>,
  ) {
    if result.success {
      let payload = result.data.unwrap_or(Value::Null);
      self.warehouse.store_with(
        widget_id,
        source_id,
        payload.clone(),
        kind,
        StoreOptions {
          ttl,
          version: Some(version),
        },
      );
      data.insert(source_id.to_string(), payload);
      self.notifier.notify(PipelineEvent::SourceCompleted {
        execution_id: execution_id.to_string(),
        widget_id: widget_id.to_string(),
        source_id: source_id.to_string(),
      });
    } else {
      let message = result
        .error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown failure".to_string());
      warn!(
        widget_id,
        source_id,
        error = %message,
        "source failed, merged result carries null"
      );
      data.insert(source_id.to_string(), Value::Null);
      errors.insert(source_id.to_string(), message.clone());
      self.notifier.notify(PipelineEvent::SourceFailed {
        execution_id: execution_id.to_string(),
        widget_id: widget_id.to_string(),
        source_id: source_id.to_string(),
        error: message,
      });
    }
  }
}
