//! Sequential skill execution.
//!
//! Steps run strictly in declaration order. Each step goes through
//! condition → input resolution → tool invocation → output extraction, and
//! its error policy decides what a failure means for the rest of the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use skillchain_config::{CompositeSkill, ErrorHandling, SkillStep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::condition::evaluate_condition;
use crate::context::ExecutionContext;
use crate::error::{ExecutionError, StepError};
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::invoker::ToolInvoker;
use crate::resolve::{extract_output, resolve_inputs};
use crate::result::{CompositeSkillExecutionResult, StepResult};

/// Runs composite skills against a tool invoker.
///
/// Holds no per-run state, so one executor can serve any number of
/// concurrent runs. Use `SkillExecutor::new()` to discard events, or
/// `SkillExecutor::with_notifier()` to observe them.
pub struct SkillExecutor<N: ExecutionNotifier = NoopNotifier> {
  invoker: Arc<dyn ToolInvoker>,
  notifier: N,
}

impl SkillExecutor<NoopNotifier> {
  pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
    Self::with_notifier(invoker, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> SkillExecutor<N> {
  pub fn with_notifier(invoker: Arc<dyn ToolInvoker>, notifier: N) -> Self {
    Self { invoker, notifier }
  }

  /// Execute `skill` with `input` bound as the context's `input` entry.
  ///
  /// Never fails: aborts and cancellation are reported through the result's
  /// `success` and `error` fields, with the step results gathered so far.
  /// `cancel` is checked before each step; an in-flight tool call is always
  /// awaited.
  pub async fn execute(
    &self,
    skill: &CompositeSkill,
    input: Value,
    cancel: CancellationToken,
  ) -> CompositeSkillExecutionResult {
    SkillRun::new(skill, self.invoker.as_ref(), &self.notifier, cancel)
      .run(input)
      .await
  }
}

/// How a single step ended.
enum StepOutcome {
  Finished(StepResult),
  Failed(StepResult, StepError),
}

/// State for one execution of one skill.
pub(crate) struct SkillRun<'a> {
  execution_id: String,
  skill: &'a CompositeSkill,
  invoker: &'a dyn ToolInvoker,
  notifier: &'a dyn ExecutionNotifier,
  cancel: CancellationToken,
}

impl<'a> SkillRun<'a> {
  pub(crate) fn new(
    skill: &'a CompositeSkill,
    invoker: &'a dyn ToolInvoker,
    notifier: &'a dyn ExecutionNotifier,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      execution_id: uuid::Uuid::new_v4().to_string(),
      skill,
      invoker,
      notifier,
      cancel,
    }
  }

  #[instrument(
    name = "skill_execute",
    skip(self, input),
    fields(
      skill_id = %self.skill.id,
      execution_id = %self.execution_id,
    )
  )]
  pub(crate) async fn run(self, input: Value) -> CompositeSkillExecutionResult {
    let started = Instant::now();
    let total_steps = self.skill.steps.len();

    info!(
      execution_id = %self.execution_id,
      skill_id = %self.skill.id,
      total_steps,
      "skill_started"
    );
    self.notifier.notify(ExecutionEvent::SkillStarted {
      execution_id: self.execution_id.clone(),
      skill_id: self.skill.id.clone(),
      total_steps,
    });

    let mut context = ExecutionContext::new(input);
    let mut step_results = Vec::with_capacity(total_steps);

    let error = match self.run_loop(&mut context, &mut step_results).await {
      Ok(()) => {
        let steps_completed = step_results.iter().filter(|r| r.success).count();
        info!(
          execution_id = %self.execution_id,
          steps_completed,
          total_steps,
          "skill_completed"
        );
        self.notifier.notify(ExecutionEvent::SkillCompleted {
          execution_id: self.execution_id.clone(),
          steps_completed,
          total_steps,
        });
        None
      }
      Err(e) => {
        error!(
          execution_id = %self.execution_id,
          error = %e,
          "skill_failed"
        );
        self.notifier.notify(ExecutionEvent::SkillFailed {
          execution_id: self.execution_id.clone(),
          error: e.to_string(),
        });
        Some(e.to_string())
      }
    };

    CompositeSkillExecutionResult::aggregate(
      self.execution_id,
      self.skill,
      step_results,
      context,
      elapsed_ms(started),
      error,
    )
  }

  async fn run_loop(
    &self,
    context: &mut ExecutionContext,
    step_results: &mut Vec<StepResult>,
  ) -> Result<(), ExecutionError> {
    for step in &self.skill.steps {
      if self.cancel.is_cancelled() {
        warn!(execution_id = %self.execution_id, "skill cancelled");
        return Err(ExecutionError::Cancelled {
          next_step_id: step.step_id.clone(),
        });
      }

      match self.run_step(step, context).await {
        StepOutcome::Finished(result) => step_results.push(result),
        StepOutcome::Failed(result, source) => {
          step_results.push(result);
          if step.error_handling == ErrorHandling::Stop {
            return Err(ExecutionError::Aborted {
              step_id: step.step_id.clone(),
              source,
            });
          }
        }
      }
    }

    Ok(())
  }

  async fn run_step(&self, step: &SkillStep, context: &mut ExecutionContext) -> StepOutcome {
    let started = Instant::now();

    if let Some(condition) = &step.condition {
      match evaluate_condition(condition, context) {
        Ok(true) => {}
        Ok(false) => return self.skip(step, context, started),
        // The context cannot change between attempts, so no retry here.
        Err(e) => return self.fail(step, e, started, 0),
      }
    }

    info!(
      execution_id = %self.execution_id,
      step_id = %step.step_id,
      tool_name = %step.tool_name,
      "step_started"
    );
    self.notifier.notify(ExecutionEvent::StepStarted {
      execution_id: self.execution_id.clone(),
      step_id: step.step_id.clone(),
      tool_name: step.tool_name.clone(),
    });

    let max_attempts = step.max_attempts();
    let mut attempt = 1;

    loop {
      let error = match self.attempt(step, context).await {
        Ok(output) => {
          if let Err(e) = context.record(&step.step_id, output.clone()) {
            return self.fail(step, e, started, attempt);
          }

          let execution_time_ms = elapsed_ms(started);
          info!(
            execution_id = %self.execution_id,
            step_id = %step.step_id,
            attempts = attempt,
            execution_time_ms,
            "step_completed"
          );
          self.notifier.notify(ExecutionEvent::StepCompleted {
            execution_id: self.execution_id.clone(),
            step_id: step.step_id.clone(),
            output: output.clone(),
          });

          return StepOutcome::Finished(StepResult::succeeded(
            &step.step_id,
            output,
            execution_time_ms,
            attempt,
          ));
        }
        Err(e) => e,
      };

      if attempt >= max_attempts || self.cancel.is_cancelled() {
        return self.fail(step, error, started, attempt);
      }

      let delay_ms = step.retry_delay_ms(attempt);
      warn!(
        execution_id = %self.execution_id,
        step_id = %step.step_id,
        attempt,
        max_attempts,
        delay_ms,
        error = %error,
        "step_retrying"
      );
      self.notifier.notify(ExecutionEvent::StepRetrying {
        execution_id: self.execution_id.clone(),
        step_id: step.step_id.clone(),
        attempt: attempt + 1,
        error: error.to_string(),
      });

      if delay_ms > 0 {
        tokio::select! {
          _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
          _ = self.cancel.cancelled() => return self.fail(step, error, started, attempt),
        }
      }

      attempt += 1;
    }
  }

  /// One pass of input resolution, invocation and output extraction.
  async fn attempt(&self, step: &SkillStep, context: &ExecutionContext) -> Result<Value, StepError> {
    let params = resolve_inputs(step.input_mapping.as_ref(), context)?;

    let raw = self
      .invoker
      .invoke(&step.tool_name, Value::Object(params))
      .await
      .map_err(|source| StepError::ToolInvocation {
        tool_name: step.tool_name.clone(),
        source,
      })?;

    extract_output(step.output_mapping.as_deref(), raw)
  }

  fn skip(&self, step: &SkillStep, context: &mut ExecutionContext, started: Instant) -> StepOutcome {
    if let Err(e) = context.record(&step.step_id, Value::Null) {
      return self.fail(step, e, started, 0);
    }

    info!(
      execution_id = %self.execution_id,
      step_id = %step.step_id,
      "step_skipped"
    );
    self.notifier.notify(ExecutionEvent::StepSkipped {
      execution_id: self.execution_id.clone(),
      step_id: step.step_id.clone(),
    });

    StepOutcome::Finished(StepResult::skipped(&step.step_id))
  }

  fn fail(&self, step: &SkillStep, error: StepError, started: Instant, attempts: u32) -> StepOutcome {
    let execution_time_ms = elapsed_ms(started);
    error!(
      execution_id = %self.execution_id,
      step_id = %step.step_id,
      error_handling = ?step.error_handling,
      attempts,
      error = %error,
      "step_failed"
    );
    self.notifier.notify(ExecutionEvent::StepFailed {
      execution_id: self.execution_id.clone(),
      step_id: step.step_id.clone(),
      error: error.to_string(),
    });

    let result = StepResult::failed(&step.step_id, error.to_string(), execution_time_ms, attempts);
    StepOutcome::Failed(result, error)
  }
}

fn elapsed_ms(started: Instant) -> u64 {
  u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
