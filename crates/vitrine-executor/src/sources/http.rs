use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::Url;
use vitrine_config::{
  kind, ErrorCode, ExecutionFailure, ExecutionMetadata, ExecutionResult, Parameter, SourceConfig,
};
use vitrine_resolver::{ParameterResolver, ResolvedParams};

use crate::context::ExecutionContext;
use crate::dedup::RequestDeduplicator;
use crate::executor::SourceExecutor;
use crate::sandbox::ScriptSandbox;

/// HTTP source options as declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HttpOptions {
  url: String,
  #[serde(default = "default_method")]
  method: String,
  #[serde(default)]
  headers: HashMap<String, String>,
  #[serde(default)]
  params: Vec<Parameter>,
  #[serde(default)]
  body: Option<Value>,
  #[serde(default)]
  timeout_ms: Option<u64>,
  /// Script run over the request config before sending.
  #[serde(default)]
  pre_script: Option<String>,
  /// Script run over the response payload after a successful fetch.
  #[serde(default)]
  post_script: Option<String>,
}

fn default_method() -> String {
  "GET".to_string()
}

/// What one underlying fetch produced; cloned to every coalesced waiter.
#[derive(Debug, Clone)]
struct HttpResponse {
  body: Value,
  byte_size: u64,
}

#[derive(Debug, Clone)]
pub struct HttpExecutorConfig {
  /// Applied when the source declares no `timeout_ms`.
  pub default_timeout: Duration,
  /// How long a completed request stays in the dedup table.
  pub dedup_retention: Duration,
}

impl Default for HttpExecutorConfig {
  fn default() -> Self {
    Self {
      default_timeout: Duration::from_secs(10),
      dedup_retention: Duration::from_millis(200),
    }
  }
}

/// Fetches from HTTP APIs.
///
/// Parameters are resolved (bindings, defaults, coercion) and placed by
/// location: path params substitute `{placeholder}` tokens in the URL, query
/// params are appended to the query string, header params merge into the
/// request headers. Structurally identical concurrent requests are coalesced
/// into one network call through the deduplicator.
///
/// Pre/post scripts run through the sandbox collaborator; a failing script is
/// logged and the untransformed config/response is used instead - a transform
/// failure never aborts the request.
pub struct HttpExecutor {
  client: Client,
  resolver: ParameterResolver,
  sandbox: Arc<dyn ScriptSandbox>,
  dedup: RequestDeduplicator<Result<HttpResponse, ExecutionFailure>>,
  config: HttpExecutorConfig,
}

impl HttpExecutor {
  pub fn new(resolver: ParameterResolver, sandbox: Arc<dyn ScriptSandbox>) -> Self {
    Self::with_config(resolver, sandbox, HttpExecutorConfig::default())
  }

  pub fn with_config(
    resolver: ParameterResolver,
    sandbox: Arc<dyn ScriptSandbox>,
    config: HttpExecutorConfig,
  ) -> Self {
    Self {
      client: Client::new(),
      resolver,
      sandbox,
      dedup: RequestDeduplicator::new(config.dedup_retention),
      config,
    }
  }

  /// Run the pre-request script, falling back to the original options when
  /// the script fails or returns something that is not a valid config.
  async fn apply_pre_script(&self, code: &str, options: HttpOptions) -> HttpOptions {
    let context = match serde_json::to_value(&options) {
      Ok(config) => serde_json::json!({ "config": config }),
      Err(e) => {
        warn!(error = %e, "could not serialize request config for pre-script");
        return options;
      }
    };

    let outcome = self.sandbox.execute_script(code, &context).await;
    let Some(data) = outcome.data.filter(|_| outcome.success) else {
      warn!(
        error = outcome.error.as_deref().unwrap_or("no data returned"),
        "pre-request script failed, sending untransformed request"
      );
      return options;
    };

    match serde_json::from_value(data) {
      Ok(transformed) => transformed,
      Err(e) => {
        warn!(error = %e, "pre-request script returned an invalid config, ignoring it");
        options
      }
    }
  }

  /// Run the post-response script, falling back to the raw payload.
  async fn apply_post_script(&self, code: &str, data: Value) -> Value {
    let context = serde_json::json!({ "response": data });
    let outcome = self.sandbox.execute_script(code, &context).await;
    match outcome.data.filter(|_| outcome.success) {
      Some(transformed) => transformed,
      None => {
        warn!(
          error = outcome.error.as_deref().unwrap_or("no data returned"),
          "post-response script failed, keeping raw response"
        );
        data
      }
    }
  }
}

#[async_trait]
impl SourceExecutor for HttpExecutor {
  fn kind(&self) -> &str {
    kind::HTTP
  }

  fn validate(&self, config: &SourceConfig) -> bool {
    matches!(
      serde_json::from_value::<HttpOptions>(config.options.clone()),
      Ok(options) if !options.url.is_empty()
    )
  }

  async fn execute(&self, ctx: &ExecutionContext, config: &SourceConfig) -> ExecutionResult {
    let started = Instant::now();
    let source_id = config.source_id.clone();

    let options: HttpOptions = match serde_json::from_value(config.options.clone()) {
      Ok(options) => options,
      Err(e) => {
        return ExecutionResult::failure(
          &source_id,
          ErrorCode::InvalidSourceConfig,
          format!("invalid http options: {e}"),
        );
      }
    };
    let options = match options.pre_script.clone() {
      Some(code) => self.apply_pre_script(&code, options).await,
      None => options,
    };

    let resolved = self.resolver.resolve_all(&options.params);

    let substituted = substitute_path(&options.url, &resolved.path);
    let mut url = match Url::parse(&substituted) {
      Ok(url) => url,
      Err(e) => {
        return ExecutionResult::failure(
          &source_id,
          ErrorCode::InvalidSourceConfig,
          format!("invalid url '{substituted}': {e}"),
        );
      }
    };
    for (key, value) in &resolved.query {
      url.query_pairs_mut().append_pair(key, value);
    }

    let method = match parse_method(&options.method) {
      Ok(method) => method,
      Err(message) => {
        return ExecutionResult::failure(&source_id, ErrorCode::InvalidSourceConfig, message);
      }
    };

    let timeout = options
      .timeout_ms
      .map(Duration::from_millis)
      .unwrap_or(self.config.default_timeout);

    let key = dedup_key(&method, &url, &resolved, &options.body);
    let fetch = {
      let client = self.client.clone();
      let headers = options.headers.clone();
      let header_params = resolved.headers.clone();
      let body = options.body.clone();
      let url = url.clone();
      move || send_request(client, method, url, headers, header_params, body, timeout)
    };

    let outcome = tokio::select! {
      outcome = self.dedup.run(key, fetch) => outcome,
      _ = ctx.cancel.cancelled() => {
        return ExecutionResult::failure(&source_id, ErrorCode::Cancelled, "execution cancelled");
      }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match outcome {
      Err(failure) => {
        ExecutionResult::failure(&source_id, failure.code, failure.message).with_metadata(
          ExecutionMetadata {
            response_time_ms: elapsed_ms,
            byte_size: 0,
          },
        )
      }
      Ok(response) => {
        let data = match &options.post_script {
          Some(code) => self.apply_post_script(code, response.body).await,
          None => response.body,
        };
        ExecutionResult::ok(&source_id, data).with_metadata(ExecutionMetadata {
          response_time_ms: elapsed_ms,
          byte_size: response.byte_size,
        })
      }
    }
  }
}

/// The actual network call, shared between coalesced waiters.
async fn send_request(
  client: Client,
  method: Method,
  url: Url,
  headers: HashMap<String, String>,
  header_params: Vec<(String, String)>,
  body: Option<Value>,
  timeout: Duration,
) -> Result<HttpResponse, ExecutionFailure> {
  let mut request = client.request(method, url).timeout(timeout);
  for (key, value) in &headers {
    request = request.header(key, value);
  }
  for (key, value) in &header_params {
    request = request.header(key, value);
  }
  if let Some(body) = &body {
    request = request.json(body);
  }

  let response = request.send().await.map_err(map_transport_error)?;
  let status = response.status();
  let text = response.text().await.map_err(map_transport_error)?;

  if !status.is_success() {
    return Err(ExecutionFailure {
      code: ErrorCode::TransportFailure,
      message: format!("HTTP {status}"),
    });
  }

  // JSON if it parses, raw text otherwise.
  let byte_size = text.len() as u64;
  let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
  Ok(HttpResponse { body, byte_size })
}

fn map_transport_error(e: reqwest::Error) -> ExecutionFailure {
  let code = if e.is_timeout() {
    ErrorCode::Timeout
  } else {
    ErrorCode::TransportFailure
  };
  ExecutionFailure {
    code,
    message: e.to_string(),
  }
}

/// Substitute resolved path params into `{placeholder}` tokens.
///
/// Unresolved placeholders are left in place; the URL parser will surface
/// them if they make the URL invalid.
fn substitute_path(url: &str, path_params: &[(String, String)]) -> String {
  let mut out = url.to_string();
  for (key, value) in path_params {
    out = out.replace(&format!("{{{key}}}"), value);
  }
  out
}

/// Structural identity of a request, used to coalesce duplicates.
///
/// Parameter classes are sorted so declaration order does not defeat
/// deduplication. Header params are part of the key: requests differing only
/// in credentials must not share a response.
fn dedup_key(method: &Method, url: &Url, resolved: &ResolvedParams, body: &Option<Value>) -> String {
  let mut path = resolved.path.clone();
  path.sort();
  let mut query = resolved.query.clone();
  query.sort();
  let mut headers = resolved.headers.clone();
  headers.sort();
  let body = body
    .as_ref()
    .map(|b| b.to_string())
    .unwrap_or_else(|| "-".to_string());
  format!("{method}|{url}|p:{path:?}|q:{query:?}|h:{headers:?}|b:{body}")
}

fn parse_method(method: &str) -> Result<Method, String> {
  match method.to_uppercase().as_str() {
    "GET" => Ok(Method::GET),
    "POST" => Ok(Method::POST),
    "PUT" => Ok(Method::PUT),
    "DELETE" => Ok(Method::DELETE),
    "PATCH" => Ok(Method::PATCH),
    "HEAD" => Ok(Method::HEAD),
    "OPTIONS" => Ok(Method::OPTIONS),
    other => Err(format!("unsupported HTTP method: {other}")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn substitute_path_replaces_tokens() {
    let out = substitute_path(
      "https://api.example/devices/{id}/metrics/{metric}",
      &[
        ("id".to_string(), "dev-1".to_string()),
        ("metric".to_string(), "temp".to_string()),
      ],
    );
    assert_eq!(out, "https://api.example/devices/dev-1/metrics/temp");
  }

  #[test]
  fn dedup_key_ignores_parameter_order() {
    let url = Url::parse("https://api.example/data").unwrap();
    let a = ResolvedParams {
      query: vec![
        ("a".to_string(), "1".to_string()),
        ("b".to_string(), "2".to_string()),
      ],
      ..Default::default()
    };
    let b = ResolvedParams {
      query: vec![
        ("b".to_string(), "2".to_string()),
        ("a".to_string(), "1".to_string()),
      ],
      ..Default::default()
    };

    assert_eq!(
      dedup_key(&Method::GET, &url, &a, &None),
      dedup_key(&Method::GET, &url, &b, &None)
    );
  }

  #[test]
  fn dedup_key_separates_bodies() {
    let url = Url::parse("https://api.example/data").unwrap();
    let resolved = ResolvedParams::default();
    let a = dedup_key(&Method::POST, &url, &resolved, &Some(serde_json::json!({"x": 1})));
    let b = dedup_key(&Method::POST, &url, &resolved, &Some(serde_json::json!({"x": 2})));
    assert_ne!(a, b);
  }

  #[test]
  fn parse_method_rejects_unknown_verbs() {
    assert!(parse_method("get").is_ok());
    assert!(parse_method("BREW").is_err());
  }
}
