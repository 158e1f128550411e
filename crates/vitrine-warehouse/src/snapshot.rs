use std::sync::Mutex;

use async_trait::async_trait;

/// One persisted `(widget, source)` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
  pub widget_id: String,
  pub source_id: String,
  pub data: serde_json::Value,
}

/// Optional write-through persistence seam for the warehouse.
///
/// The core cache is purely in-memory and non-durable; hosts that want
/// best-effort persistence across sessions inject an implementation and call
/// [`DataWarehouse::hydrate`] on startup. Persistence is fire-and-forget:
/// failures must be handled (or swallowed) by the implementation.
///
/// [`DataWarehouse::hydrate`]: crate::DataWarehouse::hydrate
#[async_trait]
pub trait SnapshotStore: Send + Sync {
  async fn persist(&self, record: SnapshotRecord);

  async fn load_all(&self) -> Vec<SnapshotRecord>;
}

/// In-memory snapshot store, for tests and as a reference implementation.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
  records: Mutex<Vec<SnapshotRecord>>,
}

impl MemorySnapshotStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
  async fn persist(&self, record: SnapshotRecord) {
    let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
    // One record per key, newest wins.
    records.retain(|r| !(r.widget_id == record.widget_id && r.source_id == record.source_id));
    records.push(record);
  }

  async fn load_all(&self) -> Vec<SnapshotRecord> {
    let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
    records.clone()
  }
}
