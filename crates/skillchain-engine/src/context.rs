//! Per-run execution context.

use serde_json::{Map, Value};

use crate::error::StepError;

/// Context key holding the caller-supplied input.
pub const INPUT_KEY: &str = "input";

/// Insertion-ordered mapping from `input` and each finished step id to the
/// value it produced.
///
/// Each key is written at most once. Paths in input mappings and conditions
/// are evaluated against the whole context document, so a step can read the
/// original input (`$.input.n`) or any earlier step's output
/// (`$.fetch.body`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
  /// Always a JSON object.
  document: Value,
}

impl ExecutionContext {
  /// Create a context holding only the caller's input.
  pub fn new(input: Value) -> Self {
    let mut entries = Map::new();
    entries.insert(INPUT_KEY.to_string(), input);
    Self {
      document: Value::Object(entries),
    }
  }

  /// The context as a JSON object, for path queries.
  pub fn as_value(&self) -> &Value {
    &self.document
  }

  pub fn into_value(self) -> Value {
    self.document
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.entries().get(key)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries().contains_key(key)
  }

  /// Keys in insertion order, starting with `input`.
  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries().keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries().is_empty()
  }

  /// Store a finished step's value. Existing entries are never replaced.
  pub fn record(&mut self, step_id: &str, value: Value) -> Result<(), StepError> {
    let entries = self.entries_mut();
    if entries.contains_key(step_id) {
      return Err(StepError::ContextConflict {
        step_id: step_id.to_string(),
      });
    }
    entries.insert(step_id.to_string(), value);
    Ok(())
  }

  fn entries(&self) -> &Map<String, Value> {
    match &self.document {
      Value::Object(entries) => entries,
      _ => unreachable!("execution context is always an object"),
    }
  }

  fn entries_mut(&mut self) -> &mut Map<String, Value> {
    match &mut self.document {
      Value::Object(entries) => entries,
      _ => unreachable!("execution context is always an object"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_new_context_holds_input() {
    let ctx = ExecutionContext::new(json!({ "n": 4 }));
    assert_eq!(ctx.get("input"), Some(&json!({ "n": 4 })));
    assert_eq!(ctx.len(), 1);
    assert_eq!(ctx.as_value(), &json!({ "input": { "n": 4 } }));
  }

  #[test]
  fn test_record_preserves_insertion_order() {
    let mut ctx = ExecutionContext::new(json!({}));
    ctx.record("zeta", json!(1)).unwrap();
    ctx.record("alpha", Value::Null).unwrap();
    ctx.record("mid", json!("x")).unwrap();

    let keys: Vec<&str> = ctx.keys().collect();
    assert_eq!(keys, vec!["input", "zeta", "alpha", "mid"]);
  }

  #[test]
  fn test_record_never_overwrites() {
    let mut ctx = ExecutionContext::new(json!({}));
    ctx.record("a", json!(1)).unwrap();

    let err = ctx.record("a", json!(2)).unwrap_err();
    assert!(matches!(err, StepError::ContextConflict { ref step_id } if step_id == "a"));
    assert_eq!(ctx.get("a"), Some(&json!(1)));

    assert!(ctx.record(INPUT_KEY, json!(3)).is_err());
  }

  #[test]
  fn test_null_entries_are_present() {
    let mut ctx = ExecutionContext::new(json!({}));
    ctx.record("skipped", Value::Null).unwrap();
    assert!(ctx.contains("skipped"));
    assert_eq!(ctx.get("skipped"), Some(&Value::Null));
  }
}
