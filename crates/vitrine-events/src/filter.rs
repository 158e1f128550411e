use crate::event::ConfigEvent;

/// A global delivery filter.
///
/// Filters run before any handler sees the event, ordered by descending
/// `priority`. The first filter to return `false` vetoes delivery entirely.
pub trait EventFilter: Send + Sync {
  /// Higher priority filters run first.
  fn priority(&self) -> i32 {
    0
  }

  /// Return `false` to suppress delivery of this event.
  fn accept(&self, event: &ConfigEvent) -> bool;
}

/// Adapter turning a closure into an [`EventFilter`].
pub struct FnFilter<F> {
  priority: i32,
  accept: F,
}

impl<F> FnFilter<F>
where
  F: Fn(&ConfigEvent) -> bool + Send + Sync,
{
  pub fn new(priority: i32, accept: F) -> Self {
    Self { priority, accept }
  }
}

impl<F> EventFilter for FnFilter<F>
where
  F: Fn(&ConfigEvent) -> bool + Send + Sync,
{
  fn priority(&self) -> i32 {
    self.priority
  }

  fn accept(&self, event: &ConfigEvent) -> bool {
    (self.accept)(event)
  }
}
