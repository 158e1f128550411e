//! Built-in source executors, one module per kind.

mod http;
mod json;
mod script;
mod static_source;
mod websocket;

pub use http::{HttpExecutor, HttpExecutorConfig};
pub use json::JsonExecutor;
pub use script::ScriptExecutor;
pub use static_source::StaticExecutor;
pub use websocket::WebSocketExecutor;
