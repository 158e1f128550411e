//! Vitrine Bridge
//!
//! Orchestrates, for one widget, the execution of all its declared sources.
//!
//! The bridge is cache-first: a live merged view in the warehouse short-
//! circuits execution entirely. Otherwise every enabled source runs in
//! parallel with join-all semantics - one source's failure neither cancels
//! nor fails the others, it just leaves `null` in that source's slot of the
//! merged result. Successful results are stored into the warehouse under the
//! version token claimed when the source execution started, which is what
//! lets the warehouse reject out-of-order completions.
//!
//! Widget-level execution succeeds as long as the pipeline itself ran;
//! per-source failures travel inside the data. Only a structurally invalid
//! requirement (or cancellation) surfaces as an `Err`.

mod bridge;
mod error;
mod events;
mod listener;

pub use bridge::{DataBridge, WidgetResult};
pub use error::BridgeError;
pub use events::{ChannelNotifier, NoopNotifier, PipelineEvent, PipelineNotifier};
pub use listener::{DataUpdateListener, FnListener, ListenerId};
