//! Vitrine Config
//!
//! This crate contains the serializable data-source configuration types for
//! vitrine. These types describe what a widget wants fetched: which sources,
//! with which parameters, and how the raw payload should be reshaped.
//!
//! Configuration is produced by the visual editor, persisted as JSON, and handed
//! to the pipeline as-is. A `SourceConfig` is immutable once it reaches an
//! executor; execution never writes back into configuration.

mod error;
mod parameter;
mod path;
mod requirement;
mod result;
mod source;
mod transform;

pub use error::ConfigError;
pub use parameter::{ParamDataType, ParamLocation, Parameter};
pub use path::value_at_path;
pub use requirement::DataRequirement;
pub use result::{ErrorCode, ExecutionFailure, ExecutionMetadata, ExecutionResult};
pub use source::{SourceConfig, kind};
pub use transform::{FilterOp, FilterRule, TransformConfig};
