use async_trait::async_trait;

/// Structured result from the external scripting sandbox.
///
/// The sandbox contract requires this shape for every invocation; a sandbox
/// must never raise out of `execute_script`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutcome {
  pub success: bool,
  pub data: Option<serde_json::Value>,
  pub error: Option<String>,
}

impl ScriptOutcome {
  pub fn ok(data: serde_json::Value) -> Self {
    Self {
      success: true,
      data: Some(data),
      error: None,
    }
  }

  pub fn failure(error: impl Into<String>) -> Self {
    Self {
      success: false,
      data: None,
      error: Some(error.into()),
    }
  }
}

/// The user-script execution collaborator.
///
/// Isolation, resource limits, and language support are the host's concern;
/// the pipeline only sees this pure `(code, context) -> outcome` surface. It
/// is used for the `script` source kind and for HTTP pre/post transforms.
#[async_trait]
pub trait ScriptSandbox: Send + Sync {
  async fn execute_script(&self, code: &str, context: &serde_json::Value) -> ScriptOutcome;
}

/// Sandbox used when the host provides none: every script fails, and the
/// surrounding pipeline degrades the way it would for any script failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSandbox;

#[async_trait]
impl ScriptSandbox for NullSandbox {
  async fn execute_script(&self, _code: &str, _context: &serde_json::Value) -> ScriptOutcome {
    ScriptOutcome::failure("no script sandbox configured")
  }
}

/// Adapter turning a synchronous closure into a [`ScriptSandbox`], mainly for
/// tests and embedders with trivial sandboxes.
pub struct FnSandbox<F>(pub F);

#[async_trait]
impl<F> ScriptSandbox for FnSandbox<F>
where
  F: Fn(&str, &serde_json::Value) -> ScriptOutcome + Send + Sync,
{
  async fn execute_script(&self, code: &str, context: &serde_json::Value) -> ScriptOutcome {
    (self.0)(code, context)
  }
}
