//! Vitrine Executor
//!
//! Executes data-source configurations through a uniform contract.
//!
//! The [`UnifiedExecutor`] dispatches a [`SourceConfig`] to whichever
//! [`SourceExecutor`] is registered for its kind and normalizes the outcome:
//! no executor may let an error escape as anything but a failure
//! [`ExecutionResult`], and an unregistered kind yields a failure with
//! `UNSUPPORTED_SOURCE_KIND` rather than an error. Declarative post-processing
//! (field extraction, key renaming, predicate filtering) runs here, after any
//! executor succeeds, so transform logic is not duplicated per kind.
//!
//! New source kinds plug in through [`UnifiedExecutor::register`] without
//! touching the dispatcher or existing kinds.
//!
//! [`SourceConfig`]: vitrine_config::SourceConfig
//! [`ExecutionResult`]: vitrine_config::ExecutionResult

mod context;
mod dedup;
mod executor;
mod registry;
mod sandbox;
mod sources;
mod transform;
mod unified;

pub use context::ExecutionContext;
pub use dedup::RequestDeduplicator;
pub use executor::SourceExecutor;
pub use registry::ExecutorRegistry;
pub use sandbox::{FnSandbox, NullSandbox, ScriptOutcome, ScriptSandbox};
pub use sources::{
  HttpExecutor, HttpExecutorConfig, JsonExecutor, ScriptExecutor, StaticExecutor,
  WebSocketExecutor,
};
pub use transform::{apply_transform, TransformError};
pub use unified::UnifiedExecutor;
