//! Integration tests running real shell-script tools.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use serde_json::{Value, json};
use skillchain_config::CompositeSkill;
use skillchain_engine::{ToolInvoker, execute_composite_skill};
use skillchain_tool_process::{ProcessInvokerConfig, ProcessToolError, ProcessToolInvoker};
use tempfile::TempDir;

fn write_tool(dir: &Path, name: &str, body: &str) {
  let path = dir.join(name);
  std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
  let mut permissions = std::fs::metadata(&path).unwrap().permissions();
  permissions.set_mode(0o755);
  std::fs::set_permissions(&path, permissions).unwrap();
}

fn tools(timeout_ms: Option<u64>) -> (TempDir, ProcessToolInvoker) {
  let dir = tempfile::tempdir().unwrap();
  write_tool(dir.path(), "echo", "cat");
  write_tool(
    dir.path(),
    "double",
    "x=$(cat | sed 's/[^0-9-]//g')\necho \"{\\\"result\\\": $((x * 2))}\"",
  );
  write_tool(
    dir.path(),
    "add10",
    "x=$(cat | sed 's/[^0-9-]//g')\necho \"{\\\"result\\\": $((x + 10))}\"",
  );
  write_tool(dir.path(), "greet", "cat > /dev/null\necho hello there");
  write_tool(dir.path(), "quiet", "exit 0");
  write_tool(dir.path(), "broken", "cat > /dev/null\necho 'bad input' >&2\nexit 3");
  write_tool(dir.path(), "slow", "sleep 5");
  write_tool(dir.path(), "chatty", "head -c 200000 /dev/zero | tr '\\0' a\ncat > /dev/null");

  let invoker = ProcessToolInvoker::new(ProcessInvokerConfig {
    tools_dir: dir.path().to_path_buf(),
    timeout_ms,
  });
  (dir, invoker)
}

#[tokio::test]
async fn test_params_arrive_on_stdin() {
  let (_dir, invoker) = tools(None);

  let output = invoker
    .invoke("echo", json!({ "x": 4, "name": "ada" }))
    .await
    .unwrap();

  assert_eq!(output, json!({ "x": 4, "name": "ada" }));
}

#[tokio::test]
async fn test_json_stdout_is_parsed() {
  let (_dir, invoker) = tools(None);
  let output = invoker.invoke("double", json!({ "x": 21 })).await.unwrap();
  assert_eq!(output, json!({ "result": 42 }));
}

#[tokio::test]
async fn test_plain_stdout_becomes_string() {
  let (_dir, invoker) = tools(None);
  let output = invoker.invoke("greet", json!({})).await.unwrap();
  assert_eq!(output, json!("hello there"));
}

#[tokio::test]
async fn test_empty_stdout_is_null() {
  let (_dir, invoker) = tools(None);
  let output = invoker.invoke("quiet", json!({ "x": 1 })).await.unwrap();
  assert_eq!(output, Value::Null);
}

#[tokio::test]
async fn test_non_zero_exit_carries_stderr() {
  let (_dir, invoker) = tools(None);

  let err = invoker.run("broken", &json!({})).await.unwrap_err();

  match err {
    ProcessToolError::Exit {
      tool_name,
      code,
      stderr,
    } => {
      assert_eq!(tool_name, "broken");
      assert_eq!(code, Some(3));
      assert_eq!(stderr, "bad input");
    }
    other => panic!("unexpected error: {other:?}"),
  }
}

#[tokio::test]
async fn test_timeout_kills_slow_tool() {
  let (_dir, invoker) = tools(Some(100));

  let started = std::time::Instant::now();
  let err = invoker.invoke("slow", json!({})).await.unwrap_err();

  assert_eq!(err.message(), "tool 'slow' timed out after 100ms");
  assert!(started.elapsed().as_secs() < 5);
}

fn large_params() -> Value {
  json!({ "blob": "x".repeat(1024 * 1024) })
}

#[tokio::test]
async fn test_timeout_covers_unread_stdin() {
  let (_dir, invoker) = tools(Some(200));

  let started = std::time::Instant::now();
  let err = invoker.invoke("slow", large_params()).await.unwrap_err();

  assert_eq!(err.message(), "tool 'slow' timed out after 200ms");
  assert!(started.elapsed().as_secs() < 3);
}

#[tokio::test]
async fn test_tool_may_ignore_large_input() {
  let (_dir, invoker) = tools(None);
  let output = invoker.invoke("quiet", large_params()).await.unwrap();
  assert_eq!(output, Value::Null);
}

#[tokio::test]
async fn test_large_output_before_reading_input() {
  let (_dir, invoker) = tools(Some(10_000));

  let output = invoker.invoke("chatty", large_params()).await.unwrap();

  assert_eq!(output.as_str().map(str::len), Some(200_000));
}

#[tokio::test]
async fn test_unknown_and_escaping_tools_fail() {
  let (_dir, invoker) = tools(None);

  let missing = invoker.invoke("missing", json!({})).await.unwrap_err();
  assert!(missing.message().starts_with("tool 'missing' not found"));

  let escaping = invoker.invoke("../echo", json!({})).await.unwrap_err();
  assert_eq!(escaping.message(), "invalid tool name '../echo'");
}

#[tokio::test]
async fn test_skill_runs_against_process_tools() {
  let (_dir, invoker) = tools(None);
  let skill: CompositeSkill = serde_json::from_value(json!({
    "id": "arith",
    "name": "Arithmetic",
    "steps": [
      { "stepId": "double", "toolName": "double", "inputMapping": { "x": "$.input.n" } },
      { "stepId": "add", "toolName": "add10", "inputMapping": { "x": "$.double.result" } },
      { "stepId": "fallible", "toolName": "broken", "errorHandling": "continue" }
    ]
  }))
  .unwrap();

  let result = execute_composite_skill(&skill, json!({ "n": 4 }), &invoker).await;

  assert!(result.success);
  assert_eq!(result.execution_context["add"], json!({ "result": 18 }));
  assert_eq!(result.steps_completed, 2);
  assert_eq!(result.final_output, Value::Null);
  assert_eq!(
    result.step_results[2].error.as_deref(),
    Some("tool 'broken' failed: tool 'broken' exited with status 3: bad input")
  );
}
