use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::enums::{ErrorHandling, RetryBackoff};

/// Number of extra attempts a `retry` step gets when `retryAttempts` is unset.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 1;

/// Parameter name to path expression, in declaration order.
pub type InputMapping = IndexMap<String, String>;

/// One unit of work in a composite skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillStep {
  pub step_id: String,
  pub tool_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub input_mapping: Option<InputMapping>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_mapping: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
  #[serde(default)]
  pub error_handling: ErrorHandling,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub retry_attempts: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub retry_delay_ms: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub retry_backoff: Option<RetryBackoff>,
}

impl SkillStep {
  /// Create a step with default policy and no mappings.
  pub fn new(step_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
    Self {
      step_id: step_id.into(),
      tool_name: tool_name.into(),
      description: None,
      input_mapping: None,
      output_mapping: None,
      condition: None,
      error_handling: ErrorHandling::default(),
      retry_attempts: None,
      retry_delay_ms: None,
      retry_backoff: None,
    }
  }

  /// Total tool invocations this step may make before giving up.
  pub fn max_attempts(&self) -> u32 {
    match self.error_handling {
      ErrorHandling::Retry => self
        .retry_attempts
        .unwrap_or(DEFAULT_RETRY_ATTEMPTS)
        .saturating_add(1),
      ErrorHandling::Stop | ErrorHandling::Continue => 1,
    }
  }

  /// Delay before the given re-attempt (1-based).
  pub fn retry_delay_ms(&self, retry: u32) -> u64 {
    let initial = self.retry_delay_ms.unwrap_or(0);
    self
      .retry_backoff
      .unwrap_or_default()
      .delay_ms(initial, retry)
  }

  /// Iterate over the step's input mapping in declaration order.
  pub fn inputs(&self) -> impl Iterator<Item = (&String, &String)> {
    self.input_mapping.iter().flat_map(|m| m.iter())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_deserialize_camel_case() {
    let step: SkillStep = serde_json::from_value(json!({
      "stepId": "fetch",
      "toolName": "http_get",
      "inputMapping": { "url": "$.input.url", "headers": "$.input.headers" },
      "outputMapping": "$.body",
      "condition": "input.enabled == true",
      "errorHandling": "retry",
      "retryAttempts": 3
    }))
    .unwrap();

    assert_eq!(step.step_id, "fetch");
    assert_eq!(step.tool_name, "http_get");
    assert_eq!(step.output_mapping.as_deref(), Some("$.body"));
    assert_eq!(step.error_handling, ErrorHandling::Retry);
    assert_eq!(step.retry_attempts, Some(3));

    let params: Vec<&str> = step.inputs().map(|(k, _)| k.as_str()).collect();
    assert_eq!(params, vec!["url", "headers"]);
  }

  #[test]
  fn test_defaults() {
    let step: SkillStep =
      serde_json::from_value(json!({ "stepId": "a", "toolName": "t" })).unwrap();

    assert_eq!(step.error_handling, ErrorHandling::Stop);
    assert!(step.input_mapping.is_none());
    assert_eq!(step.max_attempts(), 1);
    assert_eq!(step.inputs().count(), 0);
  }

  #[test]
  fn test_max_attempts() {
    let mut step = SkillStep::new("a", "t");
    step.error_handling = ErrorHandling::Retry;
    assert_eq!(step.max_attempts(), 1 + DEFAULT_RETRY_ATTEMPTS);

    step.retry_attempts = Some(2);
    assert_eq!(step.max_attempts(), 3);

    step.retry_attempts = Some(u32::MAX);
    assert_eq!(step.max_attempts(), u32::MAX);

    // retryAttempts is ignored outside the retry policy
    step.error_handling = ErrorHandling::Continue;
    assert_eq!(step.max_attempts(), 1);
  }

  #[test]
  fn test_retry_delay_uses_backoff() {
    let mut step = SkillStep::new("a", "t");
    assert_eq!(step.retry_delay_ms(2), 0);

    step.retry_delay_ms = Some(50);
    step.retry_backoff = Some(RetryBackoff::Linear);
    assert_eq!(step.retry_delay_ms(2), 100);
  }

  #[test]
  fn test_serialize_skips_unset_fields() {
    let step = SkillStep::new("a", "t");
    let value = serde_json::to_value(&step).unwrap();
    assert_eq!(
      value,
      json!({ "stepId": "a", "toolName": "t", "errorHandling": "stop" })
    );
  }
}
