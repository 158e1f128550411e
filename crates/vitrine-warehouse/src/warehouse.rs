use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::entry::{CacheEntry, EntryDebug, WidgetDebug, WidgetStorage};
use crate::snapshot::{SnapshotRecord, SnapshotStore};

/// Tuning knobs for the warehouse.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
  /// TTL applied when a store carries no override.
  pub default_ttl: Duration,
  /// Estimated-memory budget across all widgets; exceeding it triggers
  /// eviction on the next sweep.
  pub memory_budget_bytes: usize,
  /// Hard cap on a single payload; larger writes are dropped.
  pub max_entry_bytes: usize,
  /// How often the background sweep runs.
  pub sweep_interval: Duration,
}

impl Default for WarehouseConfig {
  fn default() -> Self {
    Self {
      default_ttl: Duration::from_secs(60),
      memory_budget_bytes: 50 * 1024 * 1024,
      max_entry_bytes: 5 * 1024 * 1024,
      sweep_interval: Duration::from_secs(30),
    }
  }
}

/// Per-write options.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
  /// TTL override for this entry.
  pub ttl: Option<Duration>,
  /// Version token claimed earlier via [`DataWarehouse::next_version`].
  /// When absent, a fresh token is allocated at store time.
  pub version: Option<u64>,
}

/// Point-in-time warehouse statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarehouseMetrics {
  pub hit_rate: f64,
  pub avg_get_latency_us: f64,
  pub memory_bytes: usize,
  pub entry_count: usize,
  pub widget_count: usize,
  pub stale_rejections: u64,
  pub evictions: u64,
}

/// The cache. The sole mutable shared resource of the pipeline; all mutation
/// goes through `store*`/`clear*`, and the version-rejection rule stands in
/// for writer locking - concurrent writers race and the newest version wins.
pub struct DataWarehouse {
  widgets: RwLock<HashMap<String, WidgetStorage>>,
  /// Change signals live outside the data map so a sweep that drops an empty
  /// widget does not sever its subscribers.
  signals: RwLock<HashMap<String, watch::Sender<u64>>>,
  default_ttl_ms: AtomicU64,
  config: WarehouseConfig,
  snapshot: Option<Arc<dyn SnapshotStore>>,
  hits: AtomicU64,
  misses: AtomicU64,
  stale_rejections: AtomicU64,
  evictions: AtomicU64,
  get_latency_us: AtomicU64,
  get_count: AtomicU64,
}

impl Default for DataWarehouse {
  fn default() -> Self {
    Self::new(WarehouseConfig::default())
  }
}

impl DataWarehouse {
  pub fn new(config: WarehouseConfig) -> Self {
    Self {
      widgets: RwLock::new(HashMap::new()),
      signals: RwLock::new(HashMap::new()),
      default_ttl_ms: AtomicU64::new(config.default_ttl.as_millis() as u64),
      config,
      snapshot: None,
      hits: AtomicU64::new(0),
      misses: AtomicU64::new(0),
      stale_rejections: AtomicU64::new(0),
      evictions: AtomicU64::new(0),
      get_latency_us: AtomicU64::new(0),
      get_count: AtomicU64::new(0),
    }
  }

  /// Attach a write-through snapshot store.
  pub fn with_snapshot_store(mut self, snapshot: Arc<dyn SnapshotStore>) -> Self {
    self.snapshot = Some(snapshot);
    self
  }

  /// Claim the next version token for a widget.
  ///
  /// The bridge claims a token when a source execution *starts* and passes it
  /// to [`store_with`], so a fetch that started earlier but finishes later
  /// carries the smaller token and loses to whatever already landed.
  ///
  /// [`store_with`]: DataWarehouse::store_with
  pub fn next_version(&self, widget_id: &str) -> u64 {
    let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());
    let storage = widgets.entry(widget_id.to_string()).or_default();
    storage.next_version += 1;
    storage.next_version
  }

  /// Store a result with default options.
  pub fn store(&self, widget_id: &str, source_id: &str, data: serde_json::Value, kind: &str) {
    self.store_with(widget_id, source_id, data, kind, StoreOptions::default());
  }

  /// Store a result.
  ///
  /// Never fails from the caller's point of view: stale or oversized writes
  /// are dropped and logged. An accepted write supersedes the existing entry,
  /// invalidates the merged view, and bumps the widget's change signal.
  pub fn store_with(
    &self,
    widget_id: &str,
    source_id: &str,
    data: serde_json::Value,
    kind: &str,
    opts: StoreOptions,
  ) {
    let size_bytes = serde_json::to_string(&data).map(|s| s.len()).unwrap_or(0);
    if size_bytes > self.config.max_entry_bytes {
      warn!(
        widget_id,
        source_id,
        size_bytes,
        limit = self.config.max_entry_bytes,
        "payload exceeds entry size cap, write dropped"
      );
      return;
    }

    let ttl = opts
      .ttl
      .unwrap_or_else(|| Duration::from_millis(self.default_ttl_ms.load(Ordering::Relaxed)));
    let now = Instant::now();
    let data = Arc::new(data);

    let revision = {
      let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());
      let storage = widgets.entry(widget_id.to_string()).or_default();

      let version = opts.version.unwrap_or_else(|| {
        storage.next_version += 1;
        storage.next_version
      });

      if let Some(existing) = storage.entries.get(source_id) {
        if existing.version >= version {
          self.stale_rejections.fetch_add(1, Ordering::Relaxed);
          debug!(
            widget_id,
            source_id,
            stored_version = existing.version,
            incoming_version = version,
            "stale write rejected"
          );
          return;
        }
      }

      storage.entries.insert(
        source_id.to_string(),
        CacheEntry {
          data: data.clone(),
          kind: kind.to_string(),
          version,
          size_bytes,
          stored_at: Utc::now(),
          expires_at: now + ttl,
          access_count: 0,
          last_accessed: now,
        },
      );
      storage.merged = None;
      storage.revision += 1;
      storage.revision
    };

    self.notify(widget_id, revision);
    self.persist(widget_id, source_id, &data);
  }

  /// Read the merged view for a widget: a map of `sourceId -> data` over all
  /// live entries, or `None` when nothing is live.
  ///
  /// Expired children are discarded as a side effect; the recomputed view is
  /// cached until the next mutation.
  pub fn get(&self, widget_id: &str) -> Option<Arc<serde_json::Value>> {
    let started = Instant::now();
    let result = {
      let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());
      match widgets.get_mut(widget_id) {
        None => {
          self.misses.fetch_add(1, Ordering::Relaxed);
          None
        }
        Some(storage) => {
          storage.prune_expired(Instant::now());
          if let Some(merged) = &storage.merged {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(merged.clone())
          } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            storage.recompute_merged()
          }
        }
      }
    };

    self
      .get_latency_us
      .fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);
    self.get_count.fetch_add(1, Ordering::Relaxed);
    result
  }

  /// Direct single-source read; bumps that entry's access statistics.
  pub fn get_source(&self, widget_id: &str, source_id: &str) -> Option<serde_json::Value> {
    let now = Instant::now();
    let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());

    let Some(storage) = widgets.get_mut(widget_id) else {
      self.misses.fetch_add(1, Ordering::Relaxed);
      return None;
    };

    let is_expired = storage
      .entries
      .get(source_id)
      .is_some_and(|entry| entry.is_expired(now));
    if is_expired {
      storage.entries.remove(source_id);
      storage.merged = None;
    }

    match storage.entries.get_mut(source_id) {
      Some(entry) => {
        self.hits.fetch_add(1, Ordering::Relaxed);
        entry.touch(now);
        Some((*entry.data).clone())
      }
      None => {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
      }
    }
  }

  /// Subscribe to a widget's scoped change signal.
  ///
  /// The received value is the widget's revision counter; it changes on every
  /// accepted store, clear, and eviction affecting that widget and no other.
  pub fn subscribe(&self, widget_id: &str) -> watch::Receiver<u64> {
    let mut signals = self.signals.write().unwrap_or_else(|e| e.into_inner());
    signals
      .entry(widget_id.to_string())
      .or_insert_with(|| watch::channel(0).0)
      .subscribe()
  }

  /// Drop all cached data for one widget.
  pub fn clear(&self, widget_id: &str) {
    let removed = {
      let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());
      widgets.remove(widget_id).is_some()
    };
    if removed {
      self.bump(widget_id);
      info!(widget_id, "widget cache cleared");
    }
  }

  /// Drop one source's entry for a widget.
  pub fn clear_source(&self, widget_id: &str, source_id: &str) {
    let revision = {
      let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());
      let Some(storage) = widgets.get_mut(widget_id) else {
        return;
      };
      if storage.entries.remove(source_id).is_none() {
        return;
      }
      storage.merged = None;
      storage.revision += 1;
      storage.revision
    };
    self.notify(widget_id, revision);
  }

  /// Drop everything.
  pub fn clear_all(&self) {
    let widget_ids: Vec<String> = {
      let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());
      let ids = widgets.keys().cloned().collect();
      widgets.clear();
      ids
    };
    for widget_id in &widget_ids {
      self.bump(widget_id);
    }
    info!(widgets = widget_ids.len(), "warehouse cleared");
  }

  /// Change the TTL applied to stores without an override.
  pub fn set_default_ttl(&self, ttl: Duration) {
    self
      .default_ttl_ms
      .store(ttl.as_millis() as u64, Ordering::Relaxed);
  }

  pub fn metrics(&self) -> WarehouseMetrics {
    let (memory_bytes, entry_count, widget_count) = {
      let widgets = self.widgets.read().unwrap_or_else(|e| e.into_inner());
      let memory: usize = widgets.values().map(|s| s.total_bytes()).sum();
      let entries: usize = widgets.values().map(|s| s.entries.len()).sum();
      (memory, entries, widgets.len())
    };

    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let lookups = hits + misses;
    let get_count = self.get_count.load(Ordering::Relaxed);

    WarehouseMetrics {
      hit_rate: if lookups == 0 {
        0.0
      } else {
        hits as f64 / lookups as f64
      },
      avg_get_latency_us: if get_count == 0 {
        0.0
      } else {
        self.get_latency_us.load(Ordering::Relaxed) as f64 / get_count as f64
      },
      memory_bytes,
      entry_count,
      widget_count,
      stale_rejections: self.stale_rejections.load(Ordering::Relaxed),
      evictions: self.evictions.load(Ordering::Relaxed),
    }
  }

  /// Introspection snapshot for debugging surfaces.
  pub fn debug_snapshot(&self) -> Vec<WidgetDebug> {
    let widgets = self.widgets.read().unwrap_or_else(|e| e.into_inner());
    let now = Instant::now();
    let mut out: Vec<WidgetDebug> = widgets
      .iter()
      .map(|(widget_id, storage)| WidgetDebug {
        widget_id: widget_id.clone(),
        revision: storage.revision,
        has_merged_view: storage.merged.is_some(),
        entries: storage
          .entries
          .iter()
          .map(|(source_id, entry)| EntryDebug {
            source_id: source_id.clone(),
            kind: entry.kind.clone(),
            version: entry.version,
            size_bytes: entry.size_bytes,
            access_count: entry.access_count,
            stored_at: entry.stored_at,
            expires_in_ms: entry
              .expires_at
              .saturating_duration_since(now)
              .as_millis() as i64,
          })
          .collect(),
      })
      .collect();
    out.sort_by(|a, b| a.widget_id.cmp(&b.widget_id));
    out
  }

  /// One sweep pass: drop expired entries and empty widgets, then evict under
  /// memory pressure, least-accessed and least-recently-used first.
  pub fn sweep(&self) {
    let now = Instant::now();
    let mut touched: Vec<String> = Vec::new();

    {
      let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());

      for (widget_id, storage) in widgets.iter_mut() {
        if storage.prune_expired(now) > 0 {
          storage.revision += 1;
          touched.push(widget_id.clone());
        }
      }
      widgets.retain(|_, storage| !storage.entries.is_empty());

      let total: usize = widgets.values().map(|s| s.total_bytes()).sum();
      if total > self.config.memory_budget_bytes {
        let mut candidates: Vec<(String, String, u64, Instant, usize)> = widgets
          .iter()
          .flat_map(|(widget_id, storage)| {
            storage.entries.iter().map(|(source_id, entry)| {
              (
                widget_id.clone(),
                source_id.clone(),
                entry.access_count,
                entry.last_accessed,
                entry.size_bytes,
              )
            })
          })
          .collect();
        candidates.sort_by(|a, b| a.2.cmp(&b.2).then(a.3.cmp(&b.3)));

        let mut remaining = total;
        for (widget_id, source_id, _, _, size) in candidates {
          if remaining <= self.config.memory_budget_bytes {
            break;
          }
          if let Some(storage) = widgets.get_mut(&widget_id) {
            if storage.entries.remove(&source_id).is_some() {
              storage.merged = None;
              storage.revision += 1;
              remaining -= size;
              self.evictions.fetch_add(1, Ordering::Relaxed);
              if !touched.contains(&widget_id) {
                touched.push(widget_id.clone());
              }
              debug!(widget_id = %widget_id, source_id = %source_id, size, "entry evicted");
            }
          }
        }
        widgets.retain(|_, storage| !storage.entries.is_empty());
      }
    }

    for widget_id in touched {
      self.bump(&widget_id);
    }
  }

  /// Run [`sweep`] on an interval until cancelled.
  ///
  /// [`sweep`]: DataWarehouse::sweep
  pub fn spawn_sweeper(self: &Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    let warehouse = self.clone();
    let interval = warehouse.config.sweep_interval;
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
      // The first tick fires immediately; skip it so a fresh warehouse is not
      // swept before anything is stored.
      ticker.tick().await;
      loop {
        tokio::select! {
          _ = cancel.cancelled() => {
            info!("warehouse sweeper stopped");
            break;
          }
          _ = ticker.tick() => {
            warehouse.sweep();
          }
        }
      }
    })
  }

  /// Reload persisted payloads from the snapshot store, if one is attached.
  pub async fn hydrate(&self) {
    let Some(snapshot) = &self.snapshot else {
      return;
    };
    let records = snapshot.load_all().await;
    let count = records.len();
    for record in records {
      self.store(
        &record.widget_id,
        &record.source_id,
        record.data,
        "snapshot",
      );
    }
    if count > 0 {
      info!(records = count, "warehouse hydrated from snapshot store");
    }
  }

  /// Publish a widget's current revision through its change signal.
  fn notify(&self, widget_id: &str, revision: u64) {
    let signals = self.signals.read().unwrap_or_else(|e| e.into_inner());
    if let Some(sender) = signals.get(widget_id) {
      sender.send_replace(revision);
    }
  }

  /// Bump a widget's signal without a known revision (clear paths).
  fn bump(&self, widget_id: &str) {
    let signals = self.signals.read().unwrap_or_else(|e| e.into_inner());
    if let Some(sender) = signals.get(widget_id) {
      sender.send_modify(|value| *value += 1);
    }
  }

  /// Fire-and-forget write-through to the snapshot store.
  fn persist(&self, widget_id: &str, source_id: &str, data: &Arc<serde_json::Value>) {
    let Some(snapshot) = &self.snapshot else {
      return;
    };
    // Persistence needs a runtime; store() stays usable off-runtime.
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
      return;
    };
    let snapshot = snapshot.clone();
    let record = SnapshotRecord {
      widget_id: widget_id.to_string(),
      source_id: source_id.to_string(),
      data: (**data).clone(),
    };
    handle.spawn(async move {
      snapshot.persist(record).await;
    });
  }
}
