//! Engine error types.

use skillchain_query::QueryError;

use crate::invoker::ToolError;

/// Why a single step failed. Always recorded in the step's result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StepError {
  /// An input mapping expression could not be evaluated.
  #[error("failed to resolve input '{param}' from '{expression}': {source}")]
  PathResolution {
    param: String,
    expression: String,
    #[source]
    source: QueryError,
  },

  /// The output mapping expression could not be evaluated.
  #[error("failed to extract output with '{expression}': {source}")]
  OutputExtraction {
    expression: String,
    #[source]
    source: QueryError,
  },

  /// The step's condition could not be evaluated.
  #[error("failed to evaluate condition '{expression}': {source}")]
  ConditionEvaluation {
    expression: String,
    #[source]
    source: QueryError,
  },

  /// The tool reported a failure.
  #[error("tool '{tool_name}' failed: {source}")]
  ToolInvocation {
    tool_name: String,
    #[source]
    source: ToolError,
  },

  /// The step id already has a value in the execution context.
  #[error("execution context already holds a value for step '{step_id}'")]
  ContextConflict { step_id: String },
}

/// Why a run ended before its last step.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutionError {
  /// A step failed under the `stop` policy.
  #[error("execution aborted at step '{step_id}': {source}")]
  Aborted {
    step_id: String,
    #[source]
    source: StepError,
  },

  /// The run was cancelled between steps.
  #[error("execution cancelled before step '{next_step_id}'")]
  Cancelled { next_step_id: String },
}

/// A skill definition that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid composite skill: {}", .errors.join("; "))]
pub struct DefinitionError {
  pub errors: Vec<String>,
}
