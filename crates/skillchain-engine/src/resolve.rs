//! Data threading between steps.
//!
//! Input mappings pull parameters out of the execution context; output
//! mappings pick the part of a tool's raw output that gets stored. Both use
//! the same path primitive, and both take the first match or `null`.

use serde_json::{Map, Value};
use skillchain_config::InputMapping;
use skillchain_query::JsonPath;

use crate::context::ExecutionContext;
use crate::error::StepError;

/// Resolve a step's input mapping against the whole context.
///
/// Parameters keep the mapping's order. A path with no match resolves to
/// `null`, which is how steps see skipped, failed or not-yet-run steps.
pub fn resolve_inputs(
  mapping: Option<&InputMapping>,
  context: &ExecutionContext,
) -> Result<Map<String, Value>, StepError> {
  let mut params = Map::new();

  for (param, expression) in mapping.into_iter().flatten() {
    let path = JsonPath::parse(expression).map_err(|source| StepError::PathResolution {
      param: param.clone(),
      expression: expression.clone(),
      source,
    })?;
    let value = path.first(context.as_value()).cloned().unwrap_or(Value::Null);
    params.insert(param.clone(), value);
  }

  Ok(params)
}

/// Select the value to store for a step from its tool's raw output.
pub fn extract_output(output_mapping: Option<&str>, raw: Value) -> Result<Value, StepError> {
  let Some(expression) = output_mapping else {
    return Ok(raw);
  };

  let path = JsonPath::parse(expression).map_err(|source| StepError::OutputExtraction {
    expression: expression.to_string(),
    source,
  })?;

  Ok(path.first(&raw).cloned().unwrap_or(Value::Null))
}
