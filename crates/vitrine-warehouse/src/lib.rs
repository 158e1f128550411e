//! Vitrine Warehouse
//!
//! The per-widget, per-source result cache at the center of the pipeline.
//!
//! Stored entries are versioned with a per-widget monotonic sequence; a write
//! carrying a version no newer than the stored one is silently dropped, which
//! is how out-of-order completion of concurrent fetches is resolved without
//! locking writers against each other. Entries expire by TTL, and a background
//! sweep evicts the least-recently-and-least-frequently used entries when the
//! estimated memory footprint exceeds the configured budget.
//!
//! Change notification is scoped per widget: every widget has its own watch
//! channel, so storing data for one widget never wakes readers of another.
//! Storage never returns an error to callers - writes that fail validation are
//! dropped and logged, and readers treat "no data yet" as the ordinary case.

mod entry;
mod snapshot;
mod warehouse;

pub use entry::{CacheEntry, EntryDebug, WidgetDebug};
pub use snapshot::{MemorySnapshotStore, SnapshotRecord, SnapshotStore};
pub use warehouse::{DataWarehouse, StoreOptions, WarehouseConfig, WarehouseMetrics};
