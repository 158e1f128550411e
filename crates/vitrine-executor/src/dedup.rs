use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::debug;

/// Coalesces structurally identical in-flight operations.
///
/// The first caller for a key runs the real operation; concurrent callers
/// with the same key await the same shared future and receive clones of the
/// same outcome. A completed entry lingers for a short retention window and
/// is then removed - this is a throttle against near-simultaneous redundant
/// calls (several widgets sharing one endpoint refreshing in the same tick),
/// not a cache.
pub struct RequestDeduplicator<T: Clone + Send + Sync + 'static> {
  inner: Arc<Inner<T>>,
}

struct Inner<T: Clone + Send + Sync + 'static> {
  inflight: Mutex<HashMap<String, Shared<BoxFuture<'static, T>>>>,
  retention: Duration,
}

impl<T: Clone + Send + Sync + 'static> Clone for RequestDeduplicator<T> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<T: Clone + Send + Sync + 'static> RequestDeduplicator<T> {
  pub fn new(retention: Duration) -> Self {
    Self {
      inner: Arc::new(Inner {
        inflight: Mutex::new(HashMap::new()),
        retention,
      }),
    }
  }

  /// Run `make()` for this key, unless an identical operation is already in
  /// flight - then share its outcome instead.
  pub async fn run<F>(&self, key: String, make: impl FnOnce() -> F) -> T
  where
    F: std::future::Future<Output = T> + Send + 'static,
  {
    let shared = {
      let mut inflight = self.inner.inflight.lock().unwrap_or_else(|e| e.into_inner());
      if let Some(existing) = inflight.get(&key) {
        debug!(key = %key, "request coalesced with in-flight call");
        existing.clone()
      } else {
        let shared = make().boxed().shared();
        inflight.insert(key.clone(), shared.clone());

        // Evict the entry once the call has completed and the retention
        // window has passed.
        let inner = self.inner.clone();
        let watch = shared.clone();
        tokio::spawn(async move {
          watch.await;
          tokio::time::sleep(inner.retention).await;
          let mut inflight = inner.inflight.lock().unwrap_or_else(|e| e.into_inner());
          inflight.remove(&key);
        });

        shared
      }
    };

    shared.await
  }

  /// Number of keys currently tracked (in flight or within retention).
  pub fn tracked(&self) -> usize {
    let inflight = self.inner.inflight.lock().unwrap_or_else(|e| e.into_inner());
    inflight.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[tokio::test]
  async fn concurrent_identical_calls_share_one_execution() {
    let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new(Duration::from_millis(200));
    let calls = Arc::new(AtomicUsize::new(0));

    let make = |calls: Arc<AtomicUsize>| async move {
      calls.fetch_add(1, Ordering::SeqCst);
      tokio::time::sleep(Duration::from_millis(20)).await;
      42u32
    };

    let (a, b) = tokio::join!(
      dedup.run("k".to_string(), || make(calls.clone())),
      dedup.run("k".to_string(), || make(calls.clone())),
    );

    assert_eq!(a, 42);
    assert_eq!(b, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn different_keys_do_not_coalesce() {
    let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new(Duration::from_millis(200));
    let calls = Arc::new(AtomicUsize::new(0));

    let make = |calls: Arc<AtomicUsize>, v: u32| async move {
      calls.fetch_add(1, Ordering::SeqCst);
      v
    };

    let (a, b) = tokio::join!(
      dedup.run("k1".to_string(), || make(calls.clone(), 1)),
      dedup.run("k2".to_string(), || make(calls.clone(), 2)),
    );

    assert_eq!((a, b), (1, 2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn entry_is_evicted_after_the_retention_window() {
    let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new(Duration::from_millis(30));
    let calls = Arc::new(AtomicUsize::new(0));

    let make = |calls: Arc<AtomicUsize>| async move {
      calls.fetch_add(1, Ordering::SeqCst);
      7u32
    };

    dedup.run("k".to_string(), || make(calls.clone())).await;
    assert_eq!(dedup.tracked(), 1);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(dedup.tracked(), 0);

    // A later identical call is a fresh execution, not a cached result.
    dedup.run("k".to_string(), || make(calls.clone())).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
