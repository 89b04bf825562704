//! Static checks on a skill definition.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use skillchain_config::{CompositeSkill, ErrorHandling, SkillStep};
use skillchain_query::{Expr, JsonPath};

use crate::context::INPUT_KEY;
use crate::error::DefinitionError;

/// Outcome of [`validate_composite_skill`].
///
/// `errors` make a definition unusable. `warnings` point at definitions that
/// run but probably do not do what their author meant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
  pub valid: bool,
  pub errors: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<String>,
}

impl ValidationResult {
  pub fn into_result(self) -> Result<(), DefinitionError> {
    if self.valid {
      Ok(())
    } else {
      Err(DefinitionError {
        errors: self.errors,
      })
    }
  }
}

/// Check a skill for structural problems before running it.
///
/// Every violation is reported, not just the first. Nothing is executed and
/// the skill is not modified, so validating twice gives the same result.
pub fn validate_composite_skill(skill: &CompositeSkill) -> ValidationResult {
  let mut errors = Vec::new();
  let mut warnings = Vec::new();

  if skill.id.trim().is_empty() {
    errors.push("Skill ID is required".to_string());
  }
  if skill.name.trim().is_empty() {
    errors.push("Skill name is required".to_string());
  }
  if skill.steps.is_empty() {
    errors.push("Skill must have at least one step".to_string());
  }

  // Position of the first step declaring each id, for reference checks.
  let mut positions: HashMap<&str, usize> = HashMap::new();
  for (index, step) in skill.steps.iter().enumerate() {
    positions.entry(step.step_id.as_str()).or_insert(index);
  }

  let mut seen = HashSet::new();
  for (index, step) in skill.steps.iter().enumerate() {
    let label = step_label(index, step);

    if step.step_id.trim().is_empty() {
      errors.push(format!("Step {index}: stepId is required"));
    } else if !seen.insert(step.step_id.as_str()) {
      errors.push(format!("Duplicate step ID: {}", step.step_id));
    } else if step.step_id == INPUT_KEY {
      errors.push(format!("{label}: stepId '{INPUT_KEY}' is reserved"));
    }

    if step.tool_name.trim().is_empty() {
      errors.push(format!("{label}: toolName is required"));
    }

    let mut referenced = Vec::new();

    for (param, expression) in step.inputs() {
      match JsonPath::parse(expression) {
        Ok(path) => referenced.extend(path.leading_name().map(str::to_string)),
        Err(e) => errors.push(format!(
          "{label}: invalid input mapping for '{param}': '{expression}' ({e})"
        )),
      }
    }

    if let Some(expression) = &step.output_mapping {
      if let Err(e) = JsonPath::parse(expression) {
        errors.push(format!(
          "{label}: invalid output mapping '{expression}' ({e})"
        ));
      }
    }

    if let Some(condition) = &step.condition {
      match Expr::parse(condition) {
        Ok(expr) => referenced.extend(expr.referenced_names().into_iter().map(str::to_string)),
        Err(e) => errors.push(format!("{label}: invalid condition '{condition}' ({e})")),
      }
    }

    for name in referenced {
      match positions.get(name.as_str()) {
        Some(&position) if position == index => warnings.push(format!(
          "{label}: references its own output '{name}', which resolves to null"
        )),
        Some(&position) if position > index => warnings.push(format!(
          "{label}: references later step '{name}', which resolves to null"
        )),
        _ => {}
      }
    }

    if step.error_handling != ErrorHandling::Retry && has_retry_settings(step) {
      warnings.push(format!(
        "{label}: retry settings are ignored unless errorHandling is 'retry'"
      ));
    }
  }

  ValidationResult {
    valid: errors.is_empty(),
    errors,
    warnings,
  }
}

fn step_label(index: usize, step: &SkillStep) -> String {
  if step.step_id.trim().is_empty() {
    format!("Step {index}")
  } else {
    format!("Step '{}'", step.step_id)
  }
}

fn has_retry_settings(step: &SkillStep) -> bool {
  step.retry_attempts.is_some() || step.retry_delay_ms.is_some() || step.retry_backoff.is_some()
}

#[cfg(test)]
mod tests {
  use super::*;
  use skillchain_config::RetryBackoff;

  fn skill(steps: Vec<SkillStep>) -> CompositeSkill {
    CompositeSkill {
      id: "skill".to_string(),
      name: "Skill".to_string(),
      description: None,
      version: None,
      steps,
    }
  }

  fn mapped(step_id: &str, pairs: &[(&str, &str)]) -> SkillStep {
    let mut step = SkillStep::new(step_id, "tool");
    step.input_mapping = Some(
      pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
    );
    step
  }

  #[test]
  fn test_valid_skill() {
    let result = validate_composite_skill(&skill(vec![
      mapped("a", &[("x", "$.input.n")]),
      mapped("b", &[("x", "$.a.result")]),
    ]));

    assert!(result.valid);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
    assert!(result.into_result().is_ok());
  }

  #[test]
  fn test_missing_fields_are_all_reported() {
    let mut bad = skill(vec![]);
    bad.id = String::new();
    bad.name = "  ".to_string();

    let result = validate_composite_skill(&bad);

    assert!(!result.valid);
    assert_eq!(
      result.errors,
      vec![
        "Skill ID is required",
        "Skill name is required",
        "Skill must have at least one step",
      ]
    );
  }

  #[test]
  fn test_step_fields_required() {
    let result = validate_composite_skill(&skill(vec![SkillStep::new("", "")]));
    assert_eq!(
      result.errors,
      vec!["Step 0: stepId is required", "Step 0: toolName is required"]
    );
  }

  #[test]
  fn test_reserved_step_id() {
    let result = validate_composite_skill(&skill(vec![SkillStep::new("input", "tool")]));
    assert!(!result.valid);
    assert!(result.errors[0].contains("reserved"));
  }

  #[test]
  fn test_invalid_output_mapping() {
    let mut step = SkillStep::new("a", "tool");
    step.output_mapping = Some("result".to_string());

    let result = validate_composite_skill(&skill(vec![step]));

    assert!(!result.valid);
    assert!(result.errors[0].contains("invalid output mapping 'result'"));
  }

  #[test]
  fn test_retry_settings_without_retry_warn() {
    let mut step = SkillStep::new("a", "tool");
    step.retry_backoff = Some(RetryBackoff::Linear);

    let result = validate_composite_skill(&skill(vec![step]));

    assert!(result.valid);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("retry settings are ignored"));
  }

  #[test]
  fn test_into_result_carries_errors() {
    let err = validate_composite_skill(&skill(vec![]))
      .into_result()
      .unwrap_err();
    assert_eq!(err.errors, vec!["Skill must have at least one step"]);
    assert_eq!(
      err.to_string(),
      "invalid composite skill: Skill must have at least one step"
    );
  }
}
