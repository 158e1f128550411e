//! HTTP executor integration tests against a local mock server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitrine_config::{kind, ErrorCode, ParamLocation, Parameter, SourceConfig};
use vitrine_executor::{
  ExecutionContext, FnSandbox, HttpExecutor, NullSandbox, ScriptOutcome, SourceExecutor,
};
use vitrine_resolver::{ParameterResolver, StaticWidgetLookup};

fn resolver() -> ParameterResolver {
  ParameterResolver::new(Arc::new(StaticWidgetLookup::new()))
}

fn resolver_with(widget_id: &str, state: Value) -> ParameterResolver {
  let lookup = StaticWidgetLookup::new();
  lookup.set_widget(widget_id, state);
  ParameterResolver::new(Arc::new(lookup))
}

fn http_config(url: String, params: Vec<Parameter>) -> SourceConfig {
  SourceConfig::new(
    "s1",
    kind::HTTP,
    json!({
      "url": url,
      "method": "GET",
      "params": serde_json::to_value(params).unwrap(),
    }),
  )
}

#[tokio::test]
async fn fetches_and_parses_json() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/metrics"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"temp": 22.5})))
    .expect(1)
    .mount(&server)
    .await;

  let executor = HttpExecutor::new(resolver(), Arc::new(NullSandbox));
  let ctx = ExecutionContext::new("w1");
  let config = http_config(format!("{}/metrics", server.uri()), vec![]);

  let result = executor.execute(&ctx, &config).await;
  assert!(result.success, "failure: {:?}", result.error);
  assert_eq!(result.data, Some(json!({"temp": 22.5})));
  let metadata = result.metadata.unwrap();
  assert!(metadata.byte_size > 0);
}

#[tokio::test]
async fn places_parameters_by_location() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/devices/dev-7/metrics"))
    .and(query_param("limit", "10"))
    .and(header("x-tenant", "acme"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
    .expect(1)
    .mount(&server)
    .await;

  let params = vec![
    Parameter::literal("id", ParamLocation::Path, json!("dev-7")),
    Parameter::literal("limit", ParamLocation::Query, json!("10")),
    Parameter::literal("x-tenant", ParamLocation::Header, json!("acme")),
  ];
  let executor = HttpExecutor::new(resolver(), Arc::new(NullSandbox));
  let ctx = ExecutionContext::new("w1");
  let config = http_config(format!("{}/devices/{{id}}/metrics", server.uri()), params);

  let result = executor.execute(&ctx, &config).await;
  assert!(result.success, "failure: {:?}", result.error);
}

#[tokio::test]
async fn unresolved_parameter_is_omitted_not_sent_empty() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/data"))
    .and(query_param("present", "yes"))
    .and(query_param_is_missing("absent"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
    .expect(1)
    .mount(&server)
    .await;

  let params = vec![
    Parameter::literal("present", ParamLocation::Query, json!("yes")),
    // Bound to a widget that does not exist, with no default: skipped.
    Parameter::bound("absent", ParamLocation::Query, "ghost.selection"),
  ];
  let executor = HttpExecutor::new(resolver(), Arc::new(NullSandbox));
  let ctx = ExecutionContext::new("w1");
  let config = http_config(format!("{}/data", server.uri()), params);

  let result = executor.execute(&ctx, &config).await;
  assert!(result.success, "failure: {:?}", result.error);
}

#[tokio::test]
async fn bound_parameter_uses_live_widget_state() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/data"))
    .and(query_param("device", "dev-42"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
    .expect(1)
    .mount(&server)
    .await;

  let params = vec![Parameter::bound(
    "device",
    ParamLocation::Query,
    "picker.selected",
  )];
  let resolver = resolver_with("picker", json!({"selected": "dev-42"}));
  let executor = HttpExecutor::new(resolver, Arc::new(NullSandbox));
  let ctx = ExecutionContext::new("w1");
  let config = http_config(format!("{}/data", server.uri()), params);

  let result = executor.execute(&ctx, &config).await;
  assert!(result.success, "failure: {:?}", result.error);
}

#[tokio::test]
async fn identical_concurrent_requests_share_one_network_call() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/shared"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({"n": 1}))
        .set_delay(Duration::from_millis(50)),
    )
    .expect(1)
    .mount(&server)
    .await;

  let executor = Arc::new(HttpExecutor::new(resolver(), Arc::new(NullSandbox)));
  let ctx = ExecutionContext::new("w1");
  let config = http_config(format!("{}/shared", server.uri()), vec![]);

  let (a, b) = tokio::join!(
    executor.execute(&ctx, &config),
    executor.execute(&ctx, &config),
  );

  assert!(a.success && b.success);
  assert_eq!(a.data, b.data);
  // Mock expectation (exactly one call) is verified when the server drops.
}

#[tokio::test]
async fn timeout_yields_a_timeout_failure() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/slow"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({}))
        .set_delay(Duration::from_millis(500)),
    )
    .mount(&server)
    .await;

  let executor = HttpExecutor::new(resolver(), Arc::new(NullSandbox));
  let ctx = ExecutionContext::new("w1");
  let config = SourceConfig::new(
    "s1",
    kind::HTTP,
    json!({ "url": format!("{}/slow", server.uri()), "timeout_ms": 50 }),
  );

  let result = executor.execute(&ctx, &config).await;
  assert!(!result.success);
  assert_eq!(result.error.unwrap().code, ErrorCode::Timeout);
}

#[tokio::test]
async fn server_error_yields_a_transport_failure() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/broken"))
    .respond_with(ResponseTemplate::new(502))
    .mount(&server)
    .await;

  let executor = HttpExecutor::new(resolver(), Arc::new(NullSandbox));
  let ctx = ExecutionContext::new("w1");
  let config = http_config(format!("{}/broken", server.uri()), vec![]);

  let result = executor.execute(&ctx, &config).await;
  assert!(!result.success);
  let error = result.error.unwrap();
  assert_eq!(error.code, ErrorCode::TransportFailure);
  assert!(error.message.contains("502"));
}

#[tokio::test]
async fn post_script_reshapes_the_response() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/raw"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"wrapped": {"v": 5}})))
    .mount(&server)
    .await;

  let sandbox = Arc::new(FnSandbox(|_code: &str, context: &Value| {
    ScriptOutcome::ok(context["response"]["wrapped"].clone())
  }));
  let executor = HttpExecutor::new(resolver(), sandbox);
  let ctx = ExecutionContext::new("w1");
  let config = SourceConfig::new(
    "s1",
    kind::HTTP,
    json!({ "url": format!("{}/raw", server.uri()), "post_script": "unwrap" }),
  );

  let result = executor.execute(&ctx, &config).await;
  assert_eq!(result.data, Some(json!({"v": 5})));
}

#[tokio::test]
async fn failing_post_script_falls_back_to_raw_response() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/raw"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 5})))
    .mount(&server)
    .await;

  // NullSandbox fails every script.
  let executor = HttpExecutor::new(resolver(), Arc::new(NullSandbox));
  let ctx = ExecutionContext::new("w1");
  let config = SourceConfig::new(
    "s1",
    kind::HTTP,
    json!({ "url": format!("{}/raw", server.uri()), "post_script": "broken" }),
  );

  let result = executor.execute(&ctx, &config).await;
  assert!(result.success);
  assert_eq!(result.data, Some(json!({"v": 5})));
}
