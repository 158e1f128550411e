use serde_json::Value;

/// Receives the merged result after every fresh widget execution.
///
/// Listeners are the push half of the consumer surface (the pull half is
/// reading the warehouse). They are invoked synchronously after results are
/// stored; keep them cheap and hand anything slow to a channel.
pub trait DataUpdateListener: Send + Sync {
  fn on_data_update(&self, widget_id: &str, data: &Value);
}

/// Adapter turning a closure into a [`DataUpdateListener`].
pub struct FnListener<F>(pub F);

impl<F> DataUpdateListener for FnListener<F>
where
  F: Fn(&str, &Value) + Send + Sync,
{
  fn on_data_update(&self, widget_id: &str, data: &Value) {
    (self.0)(widget_id, data)
  }
}

/// Identifies one registered listener for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
