use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::executor::SourceExecutor;

/// Maps source-kind strings to executor implementations.
///
/// The kind set is open: registering a new kind requires no change to the
/// dispatcher or to existing executors. Re-registering a kind replaces the
/// previous executor.
#[derive(Default)]
pub struct ExecutorRegistry {
  executors: RwLock<HashMap<String, Arc<dyn SourceExecutor>>>,
}

impl ExecutorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&self, kind: &str, executor: Arc<dyn SourceExecutor>) {
    let mut executors = self.executors.write().unwrap_or_else(|e| e.into_inner());
    executors.insert(kind.to_string(), executor);
  }

  pub fn get(&self, kind: &str) -> Option<Arc<dyn SourceExecutor>> {
    let executors = self.executors.read().unwrap_or_else(|e| e.into_inner());
    executors.get(kind).cloned()
  }

  /// Registered kinds, sorted for stable output.
  pub fn kinds(&self) -> Vec<String> {
    let executors = self.executors.read().unwrap_or_else(|e| e.into_inner());
    let mut kinds: Vec<String> = executors.keys().cloned().collect();
    kinds.sort();
    kinds
  }
}
