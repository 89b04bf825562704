//! The tool invocation seam.
//!
//! The engine never performs I/O itself. Every step's work goes through a
//! [`ToolInvoker`], supplied by the caller: a gateway binds one that
//! dispatches to real tools, tests bind doubles.

use async_trait::async_trait;

/// A tool failure. Tools report failures as a message only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
  message: String,
}

impl ToolError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }

  pub fn message(&self) -> &str {
    &self.message
  }
}

impl From<String> for ToolError {
  fn from(message: String) -> Self {
    Self::new(message)
  }
}

impl From<&str> for ToolError {
  fn from(message: &str) -> Self {
    Self::new(message)
  }
}

/// Performs a step's actual work.
///
/// Implementations own timeouts, permissions and sandboxing; the engine only
/// sees the returned value or the failure.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
  /// Invoke `tool_name` with the step's resolved parameters (a JSON object).
  async fn invoke(
    &self,
    tool_name: &str,
    params: serde_json::Value,
  ) -> Result<serde_json::Value, ToolError>;
}
