//! Step guard conditions.

use skillchain_query::Expr;

use crate::context::ExecutionContext;
use crate::error::StepError;

/// Decide whether a step should run.
///
/// The context's top-level keys (`input` and every finished step id) are
/// exposed as bindings, so `double.result > 5` reads the stored output of
/// step `double`. Naming a key the context does not hold is an evaluation
/// error; `$`-paths that match nothing are `null`.
pub fn evaluate_condition(condition: &str, context: &ExecutionContext) -> Result<bool, StepError> {
  let to_step_error = |source| StepError::ConditionEvaluation {
    expression: condition.to_string(),
    source,
  };

  let expr = Expr::parse(condition).map_err(to_step_error)?;
  expr.test(context.as_value()).map_err(to_step_error)
}
