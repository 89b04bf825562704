use serde::{Deserialize, Serialize};

use crate::step::SkillStep;

/// A named, versioned workflow made of an ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeSkill {
  // Missing fields are left for the validator to report.
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(default)]
  pub steps: Vec<SkillStep>,
}

impl CompositeSkill {
  /// Get a step by ID.
  pub fn get_step(&self, step_id: &str) -> Option<&SkillStep> {
    self.steps.iter().find(|s| s.step_id == step_id)
  }

  /// The step whose context value becomes the run's final output.
  pub fn last_step(&self) -> Option<&SkillStep> {
    self.steps.last()
  }
}
