//! Vitrine
//!
//! A data-source execution and caching pipeline for dashboard widgets.
//!
//! A widget declares what it wants fetched (a [`DataRequirement`] of
//! [`SourceConfig`]s); the pipeline resolves parameters against live widget
//! state, executes every enabled source in parallel, reshapes payloads with
//! declarative transforms, and stores versioned results in the
//! [`DataWarehouse`]. Consumers read the merged per-widget view, subscribe to
//! scoped change signals, or register update listeners. Configuration changes
//! arrive over the [`ConfigEventBus`] and trigger re-execution without the
//! editor knowing the pipeline exists.
//!
//! [`Pipeline`] wires all of that together; the `vitrine-*` crates under
//! `crates/` can also be used individually.

use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use vitrine_bridge::{
  BridgeError, ChannelNotifier, DataBridge, DataUpdateListener, FnListener, ListenerId,
  NoopNotifier, PipelineEvent, PipelineNotifier, WidgetResult,
};
pub use vitrine_config::{
  kind, ConfigError, DataRequirement, ErrorCode, ExecutionFailure, ExecutionMetadata,
  ExecutionResult, FilterOp, FilterRule, ParamDataType, ParamLocation, Parameter, SourceConfig,
  TransformConfig,
};
pub use vitrine_events::{
  ConfigEvent, ConfigEventBus, ConfigSection, EventFilter, EventHandler, FnFilter, FnHandler,
  HandlerError, SubscriptionId, CONFIG_CHANGED, DATA_SOURCE_CHANGED,
};
pub use vitrine_executor::{
  ExecutionContext, FnSandbox, HttpExecutor, HttpExecutorConfig, NullSandbox, ScriptOutcome,
  ScriptSandbox, SourceExecutor, UnifiedExecutor,
};
pub use vitrine_resolver::{ParameterResolver, StaticWidgetLookup, WidgetLookup};
pub use vitrine_warehouse::{
  DataWarehouse, MemorySnapshotStore, SnapshotStore, StoreOptions, WarehouseConfig,
  WarehouseMetrics,
};

use vitrine_executor::{JsonExecutor, ScriptExecutor, StaticExecutor, WebSocketExecutor};

/// Builds a [`Pipeline`] with injected collaborators.
///
/// Everything has a working default: a [`StaticWidgetLookup`] nobody has
/// populated, a [`NullSandbox`] that fails script sources, no snapshot store,
/// and default warehouse/HTTP tuning.
pub struct PipelineBuilder {
  lookup: Arc<dyn WidgetLookup>,
  sandbox: Arc<dyn ScriptSandbox>,
  notifier: Arc<dyn PipelineNotifier>,
  warehouse_config: WarehouseConfig,
  http_config: HttpExecutorConfig,
  snapshot: Option<Arc<dyn SnapshotStore>>,
}

impl Default for PipelineBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl PipelineBuilder {
  pub fn new() -> Self {
    Self {
      lookup: Arc::new(StaticWidgetLookup::new()),
      sandbox: Arc::new(NullSandbox),
      notifier: Arc::new(NoopNotifier),
      warehouse_config: WarehouseConfig::default(),
      http_config: HttpExecutorConfig::default(),
      snapshot: None,
    }
  }

  /// Source of live widget state for parameter bindings.
  pub fn with_lookup(mut self, lookup: Arc<dyn WidgetLookup>) -> Self {
    self.lookup = lookup;
    self
  }

  /// Sandbox used by script sources and HTTP pre/post scripts.
  pub fn with_sandbox(mut self, sandbox: Arc<dyn ScriptSandbox>) -> Self {
    self.sandbox = sandbox;
    self
  }

  /// Receiver for pipeline execution events.
  pub fn with_notifier(mut self, notifier: Arc<dyn PipelineNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn with_warehouse_config(mut self, config: WarehouseConfig) -> Self {
    self.warehouse_config = config;
    self
  }

  pub fn with_http_config(mut self, config: HttpExecutorConfig) -> Self {
    self.http_config = config;
    self
  }

  /// Write-through persistence for cached results, replayed on build.
  pub fn with_snapshot_store(mut self, snapshot: Arc<dyn SnapshotStore>) -> Self {
    self.snapshot = Some(snapshot);
    self
  }

  /// Assemble the pipeline: register the built-in executors, hydrate the
  /// warehouse from the snapshot store, wire the event bus to re-execution,
  /// and start the background sweeper.
  pub async fn build(self) -> Pipeline {
    let mut warehouse = DataWarehouse::new(self.warehouse_config);
    if let Some(snapshot) = self.snapshot {
      warehouse = warehouse.with_snapshot_store(snapshot);
    }
    let warehouse = Arc::new(warehouse);
    warehouse.hydrate().await;

    let executor = Arc::new(UnifiedExecutor::new());
    executor.register(kind::STATIC, Arc::new(StaticExecutor));
    executor.register(kind::JSON, Arc::new(JsonExecutor));
    executor.register(kind::WEBSOCKET, Arc::new(WebSocketExecutor));
    executor.register(kind::SCRIPT, Arc::new(ScriptExecutor::new(self.sandbox.clone())));
    executor.register(
      kind::HTTP,
      Arc::new(HttpExecutor::with_config(
        ParameterResolver::new(self.lookup.clone()),
        self.sandbox,
        self.http_config,
      )),
    );

    let bridge = Arc::new(DataBridge::with_notifier(
      warehouse.clone(),
      executor.clone(),
      self.notifier,
    ));

    let cancel = CancellationToken::new();
    let bus = Arc::new(ConfigEventBus::new());
    bus.on(
      DATA_SOURCE_CHANGED,
      Arc::new(refetch_handler(bridge.clone(), warehouse.clone(), cancel.clone())),
    );

    drop(warehouse.spawn_sweeper(cancel.child_token()));

    Pipeline {
      warehouse,
      executor,
      bridge,
      bus,
      cancel,
    }
  }
}

/// Bus handler: a data-source change invalidates the widget's cache and
/// re-runs its requirement, which is carried in the event payload.
fn refetch_handler(
  bridge: Arc<DataBridge<Arc<dyn PipelineNotifier>>>,
  warehouse: Arc<DataWarehouse>,
  cancel: CancellationToken,
) -> FnHandler<impl Fn(ConfigEvent) -> futures::future::BoxFuture<'static, Result<(), HandlerError>>>
{
  FnHandler(move |event: ConfigEvent| {
    let bridge = bridge.clone();
    let warehouse = warehouse.clone();
    let cancel = cancel.clone();
    async move {
      let requirement: DataRequirement = match serde_json::from_value(event.payload.clone()) {
        Ok(requirement) => requirement,
        Err(e) => {
          debug!(
            event_id = %event.event_id,
            widget_id = %event.widget_id,
            error = %e,
            "event payload is not a data requirement, ignoring"
          );
          return Ok(());
        }
      };
      warehouse.clear(&requirement.widget_id);
      bridge
        .execute_widget(&requirement, cancel.child_token())
        .await
        .map(|_| ())
        .map_err(|e| HandlerError::new(e.to_string()))
    }
    .boxed()
  })
}

/// The assembled pipeline.
///
/// Cheap accessors expose the pieces; most callers only need
/// [`execute_widget`], [`get_component_data`], and [`emit`].
///
/// [`execute_widget`]: Pipeline::execute_widget
/// [`get_component_data`]: Pipeline::get_component_data
/// [`emit`]: Pipeline::emit
pub struct Pipeline {
  warehouse: Arc<DataWarehouse>,
  executor: Arc<UnifiedExecutor>,
  bridge: Arc<DataBridge<Arc<dyn PipelineNotifier>>>,
  bus: Arc<ConfigEventBus>,
  cancel: CancellationToken,
}

impl Pipeline {
  /// Execute every enabled source of a requirement, cache-first.
  pub async fn execute_widget(
    &self,
    requirement: &DataRequirement,
  ) -> Result<WidgetResult, BridgeError> {
    self
      .bridge
      .execute_widget(requirement, self.cancel.child_token())
      .await
  }

  /// The live merged view for a widget, if any source data is cached.
  pub fn get_component_data(&self, widget_id: &str) -> Option<Arc<serde_json::Value>> {
    self.warehouse.get(widget_id)
  }

  /// Register a listener for fresh merged results.
  pub fn on_data_update(&self, listener: Arc<dyn DataUpdateListener>) -> ListenerId {
    self.bridge.on_data_update(listener)
  }

  pub fn remove_listener(&self, id: ListenerId) {
    self.bridge.remove_listener(id)
  }

  /// Register an executor for a custom source kind (or override a built-in).
  pub fn register_executor(&self, kind: &str, executor: Arc<dyn SourceExecutor>) {
    self.executor.register(kind, executor);
  }

  /// Emit a configuration event through the bus.
  pub async fn emit(&self, event: ConfigEvent) {
    self.bus.emit(event).await
  }

  pub fn bus(&self) -> &Arc<ConfigEventBus> {
    &self.bus
  }

  pub fn warehouse(&self) -> &Arc<DataWarehouse> {
    &self.warehouse
  }

  /// Stop the background sweeper and cancel in-flight executions.
  pub fn shutdown(&self) {
    self.cancel.cancel();
  }
}
