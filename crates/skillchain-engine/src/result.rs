//! Step and run results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skillchain_config::CompositeSkill;

use crate::context::ExecutionContext;

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
  pub step_id: String,
  pub success: bool,
  /// The stored value on success, `null` when skipped, absent on failure.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub execution_time_ms: u64,
  pub attempts: u32,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub skipped: bool,
}

impl StepResult {
  pub fn succeeded(step_id: &str, output: Value, execution_time_ms: u64, attempts: u32) -> Self {
    Self {
      step_id: step_id.to_string(),
      success: true,
      output: Some(output),
      error: None,
      execution_time_ms,
      attempts,
      skipped: false,
    }
  }

  /// A step whose condition evaluated false. It counts as a success.
  pub fn skipped(step_id: &str) -> Self {
    Self {
      step_id: step_id.to_string(),
      success: true,
      output: Some(Value::Null),
      error: None,
      execution_time_ms: 0,
      attempts: 0,
      skipped: true,
    }
  }

  pub fn failed(
    step_id: &str,
    error: impl Into<String>,
    execution_time_ms: u64,
    attempts: u32,
  ) -> Self {
    Self {
      step_id: step_id.to_string(),
      success: false,
      output: None,
      error: Some(error.into()),
      execution_time_ms,
      attempts,
      skipped: false,
    }
  }
}

/// Aggregated outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeSkillExecutionResult {
  /// False only when the run was aborted by a `stop` step or cancelled.
  pub success: bool,
  pub execution_id: String,
  pub skill_id: String,
  pub step_results: Vec<StepResult>,
  /// The context value stored under the last declared step's id.
  pub final_output: Value,
  pub execution_context: Value,
  pub execution_time_ms: u64,
  pub steps_completed: usize,
  pub total_steps: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl CompositeSkillExecutionResult {
  pub(crate) fn aggregate(
    execution_id: String,
    skill: &CompositeSkill,
    step_results: Vec<StepResult>,
    context: ExecutionContext,
    execution_time_ms: u64,
    error: Option<String>,
  ) -> Self {
    let final_output = skill
      .last_step()
      .and_then(|step| context.get(&step.step_id))
      .cloned()
      .unwrap_or(Value::Null);
    let steps_completed = step_results.iter().filter(|r| r.success).count();

    Self {
      success: error.is_none(),
      execution_id,
      skill_id: skill.id.clone(),
      step_results,
      final_output,
      execution_context: context.into_value(),
      execution_time_ms,
      steps_completed,
      total_steps: skill.steps.len(),
      error,
    }
  }

  pub fn step_result(&self, step_id: &str) -> Option<&StepResult> {
    self.step_results.iter().find(|r| r.step_id == step_id)
  }

  pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
    self.step_results.iter().filter(|r| !r.success)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use skillchain_config::SkillStep;

  fn two_step_skill() -> CompositeSkill {
    CompositeSkill {
      id: "skill".to_string(),
      name: "Skill".to_string(),
      description: None,
      version: None,
      steps: vec![SkillStep::new("a", "tool"), SkillStep::new("b", "tool")],
    }
  }

  #[test]
  fn test_aggregate_final_output_from_last_step() {
    let mut context = ExecutionContext::new(json!({ "n": 4 }));
    context.record("a", json!({ "result": 8 })).unwrap();
    context.record("b", json!({ "result": 18 })).unwrap();

    let result = CompositeSkillExecutionResult::aggregate(
      "exec".to_string(),
      &two_step_skill(),
      vec![
        StepResult::succeeded("a", json!({ "result": 8 }), 1, 1),
        StepResult::succeeded("b", json!({ "result": 18 }), 1, 1),
      ],
      context,
      2,
      None,
    );

    assert!(result.success);
    assert_eq!(result.final_output, json!({ "result": 18 }));
    assert_eq!(result.steps_completed, 2);
    assert_eq!(result.total_steps, 2);
    assert_eq!(
      result.execution_context,
      json!({ "input": { "n": 4 }, "a": { "result": 8 }, "b": { "result": 18 } })
    );
  }

  #[test]
  fn test_final_output_null_when_last_step_failed() {
    let mut context = ExecutionContext::new(json!({}));
    context.record("a", json!(1)).unwrap();

    let result = CompositeSkillExecutionResult::aggregate(
      "exec".to_string(),
      &two_step_skill(),
      vec![
        StepResult::succeeded("a", json!(1), 0, 1),
        StepResult::failed("b", "boom", 0, 1),
      ],
      context,
      0,
      None,
    );

    assert!(result.success);
    assert_eq!(result.final_output, Value::Null);
    assert_eq!(result.steps_completed, 1);
    assert_eq!(result.failed_steps().count(), 1);
  }

  #[test]
  fn test_step_result_serialization() {
    assert_eq!(
      serde_json::to_value(StepResult::skipped("a")).unwrap(),
      json!({
        "stepId": "a",
        "success": true,
        "output": null,
        "executionTimeMs": 0,
        "attempts": 0,
        "skipped": true
      })
    );
    assert_eq!(
      serde_json::to_value(StepResult::failed("b", "boom", 3, 2)).unwrap(),
      json!({
        "stepId": "b",
        "success": false,
        "error": "boom",
        "executionTimeMs": 3,
        "attempts": 2
      })
    );
  }
}
