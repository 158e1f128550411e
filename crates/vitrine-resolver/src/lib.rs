//! Vitrine Resolver
//!
//! Resolves declared request parameters to concrete values at execution time.
//!
//! Resolution order for each parameter:
//! 1. a binding reference (`widgetId.propertyPath`) is looked up against the
//!    live widget registry,
//! 2. an empty literal/bound value falls back to the configured default,
//! 3. a parameter that is still empty is skipped - omitted from the request
//!    rather than sent as an empty value,
//! 4. the value is coerced to the declared data type with a total conversion
//!    (non-convertible input degrades to a zero value, never an error).
//!
//! Skipping instead of failing keeps one unresolved parameter from aborting a
//! multi-source fetch.

mod coerce;
mod lookup;
mod resolver;

pub use coerce::coerce;
pub use lookup::{StaticWidgetLookup, WidgetLookup};
pub use resolver::{ParameterResolver, ResolvedParams};
