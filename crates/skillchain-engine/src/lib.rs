//! Skillchain Engine
//!
//! Validates and executes composite skills: ordered lists of tool-invoking
//! steps that thread data to each other through a shared execution context.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SkillExecutor                         │
//! │  - execute(skill, input, cancel) → execution result         │
//! │  - sequential steps, error policies, events                 │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//!   condition / resolve   ExecutionContext      ToolInvoker
//!   (skillchain-query)    (input + step ids)    (caller-supplied)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use skillchain_engine::{SkillExecutor, validate_composite_skill};
//! use tokio_util::sync::CancellationToken;
//!
//! validate_composite_skill(&skill).into_result()?;
//!
//! let executor = SkillExecutor::new(Arc::new(my_invoker));
//! let result = executor
//!   .execute(&skill, json!({ "n": 4 }), CancellationToken::new())
//!   .await;
//! ```

mod condition;
mod context;
mod error;
mod events;
mod executor;
mod invoker;
mod resolve;
mod result;
mod validate;

use serde_json::Value;
use skillchain_config::CompositeSkill;
use tokio_util::sync::CancellationToken;

pub use condition::evaluate_condition;
pub use context::{ExecutionContext, INPUT_KEY};
pub use error::{DefinitionError, ExecutionError, StepError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executor::SkillExecutor;
pub use invoker::{ToolError, ToolInvoker};
pub use resolve::{extract_output, resolve_inputs};
pub use result::{CompositeSkillExecutionResult, StepResult};
pub use validate::{ValidationResult, validate_composite_skill};

/// Execute `skill` once with a borrowed invoker, no events and no
/// cancellation. See [`SkillExecutor::execute`].
pub async fn execute_composite_skill(
  skill: &CompositeSkill,
  input: Value,
  invoker: &dyn ToolInvoker,
) -> CompositeSkillExecutionResult {
  executor::SkillRun::new(skill, invoker, &NoopNotifier, CancellationToken::new())
    .run(input)
    .await
}
