//! Process invoker error types.

use std::path::PathBuf;

use skillchain_engine::ToolError;

/// Errors that can occur while running a tool executable.
#[derive(Debug, thiserror::Error)]
pub enum ProcessToolError {
  /// Tool names are plain file names inside the tools directory.
  #[error("invalid tool name '{tool_name}'")]
  InvalidToolName { tool_name: String },

  #[error("tool '{tool_name}' not found at {}", .path.display())]
  NotFound { tool_name: String, path: PathBuf },

  #[error("failed to serialize params for tool '{tool_name}': {source}")]
  Params {
    tool_name: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to spawn tool '{tool_name}': {source}")]
  Spawn {
    tool_name: String,
    #[source]
    source: std::io::Error,
  },

  #[error("i/o error while running tool '{tool_name}': {source}")]
  Io {
    tool_name: String,
    #[source]
    source: std::io::Error,
  },

  #[error("tool '{tool_name}' timed out after {timeout_ms}ms")]
  Timeout { tool_name: String, timeout_ms: u64 },

  /// The tool exited unsuccessfully. `code` is `None` when it was killed by
  /// a signal.
  #[error("tool '{tool_name}' exited with {}: {stderr}", exit_description(.code))]
  Exit {
    tool_name: String,
    code: Option<i32>,
    stderr: String,
  },
}

fn exit_description(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("status {code}"),
    None => "a signal".to_string(),
  }
}

impl From<ProcessToolError> for ToolError {
  fn from(err: ProcessToolError) -> Self {
    ToolError::new(err.to_string())
  }
}
