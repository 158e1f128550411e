use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use vitrine_bridge::{BridgeError, ChannelNotifier, DataBridge, FnListener, PipelineEvent};
use vitrine_config::{DataRequirement, ErrorCode, ExecutionResult, SourceConfig};
use vitrine_executor::{ExecutionContext, SourceExecutor, UnifiedExecutor};
use vitrine_warehouse::DataWarehouse;

/// Returns a fixed payload and counts how often it ran.
struct CountingExecutor {
  payload: Value,
  calls: AtomicUsize,
}

impl CountingExecutor {
  fn new(payload: Value) -> Arc<Self> {
    Arc::new(Self {
      payload,
      calls: AtomicUsize::new(0),
    })
  }
}

#[async_trait]
impl SourceExecutor for CountingExecutor {
  fn kind(&self) -> &str {
    "stub"
  }

  async fn execute(&self, _ctx: &ExecutionContext, config: &SourceConfig) -> ExecutionResult {
    self.calls.fetch_add(1, Ordering::SeqCst);
    ExecutionResult::ok(&config.source_id, self.payload.clone())
  }
}

/// Always fails with a transport error.
struct FailingExecutor;

#[async_trait]
impl SourceExecutor for FailingExecutor {
  fn kind(&self) -> &str {
    "failing"
  }

  async fn execute(&self, _ctx: &ExecutionContext, config: &SourceConfig) -> ExecutionResult {
    ExecutionResult::failure(&config.source_id, ErrorCode::TransportFailure, "boom")
  }
}

/// Sleeps long enough that a cancellation can land first.
struct SlowExecutor;

#[async_trait]
impl SourceExecutor for SlowExecutor {
  fn kind(&self) -> &str {
    "slow"
  }

  async fn execute(&self, _ctx: &ExecutionContext, config: &SourceConfig) -> ExecutionResult {
    tokio::time::sleep(Duration::from_secs(5)).await;
    ExecutionResult::ok(&config.source_id, json!("too late"))
  }
}

fn bridge_with(
  kinds: &[(&str, Arc<dyn SourceExecutor>)],
) -> (DataBridge, Arc<DataWarehouse>) {
  let warehouse = Arc::new(DataWarehouse::default());
  let executor = Arc::new(UnifiedExecutor::new());
  for (kind, exec) in kinds {
    executor.register(kind, exec.clone());
  }
  (DataBridge::new(warehouse.clone(), executor), warehouse)
}

#[tokio::test]
async fn one_failed_source_leaves_null_without_failing_the_widget() {
  let good = CountingExecutor::new(json!({"temp": 22.5}));
  let (bridge, _) = bridge_with(&[
    ("stub", good.clone()),
    ("failing", Arc::new(FailingExecutor)),
  ]);

  let requirement = DataRequirement::new(
    "w1",
    vec![
      SourceConfig::new("s1", "stub", json!({})),
      SourceConfig::new("s2", "failing", json!({})),
      SourceConfig::new("s3", "stub", json!({})),
    ],
  );

  let result = bridge
    .execute_widget(&requirement, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(result.data["s1"], json!({"temp": 22.5}));
  assert_eq!(result.data["s2"], Value::Null);
  assert_eq!(result.data["s3"], json!({"temp": 22.5}));
  assert!(result.errors.contains_key("s2"));
  assert!(result.errors["s2"].contains("TRANSPORT_FAILURE"));
  assert!(!result.from_cache);
}

#[tokio::test]
async fn second_execution_within_ttl_is_served_from_cache() {
  let stub = CountingExecutor::new(json!({"temp": 22.5}));
  let (bridge, warehouse) = bridge_with(&[("stub", stub.clone())]);

  let requirement = DataRequirement::new("w1", vec![SourceConfig::new("s1", "stub", json!({}))]);

  let first = bridge
    .execute_widget(&requirement, CancellationToken::new())
    .await
    .unwrap();
  assert!(!first.from_cache);

  let second = bridge
    .execute_widget(&requirement, CancellationToken::new())
    .await
    .unwrap();
  assert!(second.from_cache);
  assert_eq!(second.data, first.data);
  assert_eq!(stub.calls.load(Ordering::SeqCst), 1);

  let merged = warehouse.get("w1").unwrap();
  assert_eq!(*merged, json!({"s1": {"temp": 22.5}}));
}

#[tokio::test]
async fn listeners_receive_the_merged_result() {
  let stub = CountingExecutor::new(json!(7));
  let (bridge, _) = bridge_with(&[("stub", stub)]);

  let seen: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();
  let id = bridge.on_data_update(Arc::new(FnListener(move |widget_id: &str, data: &Value| {
    sink.lock().unwrap().push((widget_id.to_string(), data.clone()));
  })));

  let requirement = DataRequirement::new("w1", vec![SourceConfig::new("s1", "stub", json!({}))]);
  bridge
    .execute_widget(&requirement, CancellationToken::new())
    .await
    .unwrap();

  {
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "w1");
    assert_eq!(seen[0].1, json!({"s1": 7}));
  }

  // Removed listeners stay silent, and cache hits never notify.
  bridge.remove_listener(id);
  bridge
    .execute_widget(&requirement, CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn disabled_sources_are_skipped() {
  let stub = CountingExecutor::new(json!(1));
  let (bridge, _) = bridge_with(&[("stub", stub.clone())]);

  let mut disabled = SourceConfig::new("s2", "stub", json!({}));
  disabled.enabled = false;
  let requirement = DataRequirement::new(
    "w1",
    vec![SourceConfig::new("s1", "stub", json!({})), disabled],
  );

  let result = bridge
    .execute_widget(&requirement, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
  assert_eq!(result.data, json!({"s1": 1}));
  assert!(!result.data.as_object().unwrap().contains_key("s2"));
}

#[tokio::test]
async fn cancellation_aborts_the_widget() {
  let (bridge, warehouse) = bridge_with(&[("slow", Arc::new(SlowExecutor))]);

  let requirement = DataRequirement::new("w1", vec![SourceConfig::new("s1", "slow", json!({}))]);
  let cancel = CancellationToken::new();
  let canceller = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    canceller.cancel();
  });

  let result = bridge.execute_widget(&requirement, cancel).await;
  assert!(matches!(result, Err(BridgeError::Cancelled)));
  assert!(warehouse.get("w1").is_none());
}

#[tokio::test]
async fn invalid_requirement_is_a_hard_error() {
  let (bridge, _) = bridge_with(&[]);

  let requirement = DataRequirement::new(
    "w1",
    vec![
      SourceConfig::new("s1", "stub", json!({})),
      SourceConfig::new("s1", "stub", json!({})),
    ],
  );

  let result = bridge
    .execute_widget(&requirement, CancellationToken::new())
    .await;
  assert!(matches!(result, Err(BridgeError::InvalidRequirement(_))));
}

#[tokio::test]
async fn notifier_sees_the_whole_execution() {
  let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
  let warehouse = Arc::new(DataWarehouse::default());
  let executor = Arc::new(UnifiedExecutor::new());
  executor.register("stub", CountingExecutor::new(json!(1)));
  executor.register("failing", Arc::new(FailingExecutor));
  let bridge = DataBridge::with_notifier(warehouse, executor, ChannelNotifier::new(sender));

  let requirement = DataRequirement::new(
    "w1",
    vec![
      SourceConfig::new("s1", "stub", json!({})),
      SourceConfig::new("s2", "failing", json!({})),
    ],
  );
  bridge
    .execute_widget(&requirement, CancellationToken::new())
    .await
    .unwrap();

  let mut events = Vec::new();
  while let Ok(event) = receiver.try_recv() {
    events.push(event);
  }

  assert!(matches!(events.first(), Some(PipelineEvent::WidgetStarted { sources: 2, .. })));
  assert!(matches!(events.last(), Some(PipelineEvent::WidgetCompleted { .. })));
  assert!(events
    .iter()
    .any(|e| matches!(e, PipelineEvent::SourceCompleted { source_id, .. } if source_id == "s1")));
  assert!(events
    .iter()
    .any(|e| matches!(e, PipelineEvent::SourceFailed { source_id, .. } if source_id == "s2")));
}
