//! Vitrine Events
//!
//! A filtered pub/sub bus decoupling "a widget's configuration changed" from
//! "therefore re-run the fetch pipeline".
//!
//! Producers emit a [`ConfigEvent`] describing which configuration section
//! changed; the bus derives the concrete event types to fire from the section
//! (a data-source change fires `data-source-changed` in addition to the generic
//! `config-changed`), runs the event through globally registered filters in
//! priority order (any filter can veto delivery), and invokes all matching
//! handlers concurrently. Handler failures are isolated and logged - one
//! failing handler never blocks or fails the others.
//!
//! Filters let consumers veto re-execution for purely cosmetic changes without
//! the producer knowing any consumer exists.

mod bus;
mod event;
mod filter;

pub use bus::{ConfigEventBus, EventHandler, FnHandler, HandlerError, SubscriptionId};
pub use event::{ConfigEvent, ConfigSection, CONFIG_CHANGED, DATA_SOURCE_CHANGED};
pub use filter::{EventFilter, FnFilter};
