//! Tool invocation through child processes.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use skillchain_engine::{ToolError, ToolInvoker};
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, instrument};

use crate::error::ProcessToolError;

/// Configuration for the process tool invoker.
#[derive(Debug, Clone)]
pub struct ProcessInvokerConfig {
  /// Directory holding one executable per tool name.
  pub tools_dir: PathBuf,
  /// Per-invocation limit. The child is killed when it runs longer.
  pub timeout_ms: Option<u64>,
}

/// Runs `<tools_dir>/<tool_name>` for every invocation.
///
/// Params are written to stdin as a single JSON document and stdin is then
/// closed. Stdout is parsed as JSON; output that is not JSON is returned as a
/// string, and empty output as `null`. A non-zero exit fails the call with
/// the tool's stderr as the message.
#[derive(Debug, Clone)]
pub struct ProcessToolInvoker {
  config: ProcessInvokerConfig,
}

impl ProcessToolInvoker {
  pub fn new(config: ProcessInvokerConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &ProcessInvokerConfig {
    &self.config
  }

  /// Path of the executable for `tool_name`, refusing anything that could
  /// escape the tools directory.
  pub fn tool_path(&self, tool_name: &str) -> Result<PathBuf, ProcessToolError> {
    let escapes = tool_name.is_empty()
      || tool_name.contains('/')
      || tool_name.contains('\\')
      || tool_name.contains("..");
    if escapes {
      return Err(ProcessToolError::InvalidToolName {
        tool_name: tool_name.to_string(),
      });
    }

    let path = self.config.tools_dir.join(tool_name);
    if !path.is_file() {
      return Err(ProcessToolError::NotFound {
        tool_name: tool_name.to_string(),
        path,
      });
    }
    Ok(path)
  }

  #[instrument(name = "tool_process", skip(self, params), fields(tool_name = %tool_name))]
  pub async fn run(&self, tool_name: &str, params: &Value) -> Result<Value, ProcessToolError> {
    let path = self.tool_path(tool_name)?;
    let input = serde_json::to_vec(params).map_err(|source| ProcessToolError::Params {
      tool_name: tool_name.to_string(),
      source,
    })?;

    let mut child = Command::new(&path)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| ProcessToolError::Spawn {
        tool_name: tool_name.to_string(),
        source,
      })?;

    // Feed stdin while collecting output so neither side can block the other,
    // and so the timeout covers the whole exchange.
    let stdin = child.stdin.take();
    let exchange = async move {
      let (written, output) = tokio::join!(write_input(stdin, &input), child.wait_with_output());
      written?;
      output
    };

    let output = match self.config.timeout_ms {
      Some(timeout_ms) => tokio::time::timeout(Duration::from_millis(timeout_ms), exchange)
        .await
        .map_err(|_| ProcessToolError::Timeout {
          tool_name: tool_name.to_string(),
          timeout_ms,
        })?,
      None => exchange.await,
    }
    .map_err(|source| ProcessToolError::Io {
      tool_name: tool_name.to_string(),
      source,
    })?;

    debug!(
      tool_name = %tool_name,
      status = ?output.status.code(),
      stdout_bytes = output.stdout.len(),
      "tool_exited"
    );

    if !output.status.success() {
      return Err(ProcessToolError::Exit {
        tool_name: tool_name.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    Ok(parse_stdout(&output.stdout))
  }
}

#[async_trait]
impl ToolInvoker for ProcessToolInvoker {
  async fn invoke(&self, tool_name: &str, params: Value) -> Result<Value, ToolError> {
    self.run(tool_name, &params).await.map_err(ToolError::from)
  }
}

/// Write the params and close stdin.
async fn write_input(stdin: Option<ChildStdin>, input: &[u8]) -> std::io::Result<()> {
  let Some(mut stdin) = stdin else {
    return Ok(());
  };
  match stdin.write_all(input).await {
    // The tool exited without reading its params.
    Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
    result => result,
  }
}

fn parse_stdout(stdout: &[u8]) -> Value {
  let text = String::from_utf8_lossy(stdout);
  let text = text.trim();
  if text.is_empty() {
    return Value::Null;
  }
  serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
