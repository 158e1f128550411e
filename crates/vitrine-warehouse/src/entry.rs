use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One cached result for a `(widget, source)` key.
///
/// Entries are superseded, never mutated in place: an accepted write replaces
/// the whole entry. Access statistics feed the composite eviction order.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub data: Arc<serde_json::Value>,
  pub kind: String,
  pub version: u64,
  pub size_bytes: usize,
  pub stored_at: DateTime<Utc>,
  pub expires_at: Instant,
  pub access_count: u64,
  pub last_accessed: Instant,
}

impl CacheEntry {
  pub fn is_expired(&self, now: Instant) -> bool {
    now >= self.expires_at
  }

  /// Record a read for eviction-ordering purposes.
  pub fn touch(&mut self, now: Instant) {
    self.access_count += 1;
    self.last_accessed = now;
  }
}

/// Per-widget aggregate: live entries plus the cached merged view.
///
/// The merged view is invalidated eagerly whenever any child entry is added
/// or removed, so a present merged view is never older than its children.
#[derive(Debug, Default)]
pub(crate) struct WidgetStorage {
  pub entries: HashMap<String, CacheEntry>,
  pub merged: Option<Arc<serde_json::Value>>,
  /// Next version token handed out for this widget.
  pub next_version: u64,
  /// Bumped on every accepted mutation; published through the change signal.
  pub revision: u64,
}

impl WidgetStorage {
  /// Drop expired entries; returns how many were removed.
  pub fn prune_expired(&mut self, now: Instant) -> usize {
    let before = self.entries.len();
    self.entries.retain(|_, entry| !entry.is_expired(now));
    let removed = before - self.entries.len();
    if removed > 0 {
      self.merged = None;
    }
    removed
  }

  /// Rebuild the merged view from live entries. `None` when nothing is live.
  pub fn recompute_merged(&mut self) -> Option<Arc<serde_json::Value>> {
    if self.entries.is_empty() {
      self.merged = None;
      return None;
    }
    let mut map = serde_json::Map::with_capacity(self.entries.len());
    for (source_id, entry) in &self.entries {
      map.insert(source_id.clone(), (*entry.data).clone());
    }
    let merged = Arc::new(serde_json::Value::Object(map));
    self.merged = Some(merged.clone());
    Some(merged)
  }

  pub fn total_bytes(&self) -> usize {
    self.entries.values().map(|e| e.size_bytes).sum()
  }
}

/// Introspection summary for one cache entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryDebug {
  pub source_id: String,
  pub kind: String,
  pub version: u64,
  pub size_bytes: usize,
  pub access_count: u64,
  pub stored_at: DateTime<Utc>,
  pub expires_in_ms: i64,
}

/// Introspection summary for one widget.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetDebug {
  pub widget_id: String,
  pub revision: u64,
  pub has_merged_view: bool,
  pub entries: Vec<EntryDebug>,
}
