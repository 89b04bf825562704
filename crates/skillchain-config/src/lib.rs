//! Skillchain Config
//!
//! This crate contains the serializable composite skill definitions for
//! skillchain. These types describe a skill as it was authored, before it is
//! validated and handed to the engine for execution.
//!
//! Definitions are JSON documents with camelCase keys:
//!
//! ```json
//! {
//!   "id": "double-then-add",
//!   "name": "Double then add ten",
//!   "steps": [
//!     { "stepId": "double", "toolName": "double", "inputMapping": { "x": "$.input.n" } },
//!     { "stepId": "add10", "toolName": "add10", "inputMapping": { "x": "$.double.result" } }
//!   ]
//! }
//! ```

mod enums;
mod skill;
mod step;

pub use enums::{ErrorHandling, RetryBackoff};
pub use skill::CompositeSkill;
pub use step::{DEFAULT_RETRY_ATTEMPTS, InputMapping, SkillStep};
