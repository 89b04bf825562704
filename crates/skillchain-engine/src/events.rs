//! Execution events and notifiers for observability.
//!
//! Events are emitted while a skill runs so consumers can follow progress,
//! persist it, or stream it elsewhere.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during skill execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  /// Skill execution has started.
  SkillStarted {
    execution_id: String,
    skill_id: String,
    total_steps: usize,
  },

  /// A step's condition passed and its tool is about to be invoked.
  StepStarted {
    execution_id: String,
    step_id: String,
    tool_name: String,
  },

  /// A step's condition evaluated false.
  StepSkipped {
    execution_id: String,
    step_id: String,
  },

  /// A step attempt failed and another attempt will follow.
  StepRetrying {
    execution_id: String,
    step_id: String,
    /// The attempt about to start, 1-based.
    attempt: u32,
    error: String,
  },

  /// A step has completed successfully.
  StepCompleted {
    execution_id: String,
    step_id: String,
    output: serde_json::Value,
  },

  /// A step has failed for good.
  StepFailed {
    execution_id: String,
    step_id: String,
    error: String,
  },

  /// Every step has been processed.
  SkillCompleted {
    execution_id: String,
    steps_completed: usize,
    total_steps: usize,
  },

  /// The run was aborted or cancelled.
  SkillFailed { execution_id: String, error: String },
}

/// Trait for receiving execution events.
///
/// The executor calls `notify` for each event; implementations decide what
/// to do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Unbounded so a slow consumer never stalls a run; a run emits a handful of
/// events per step.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_events_serialize_with_tag() {
    let event = ExecutionEvent::StepRetrying {
      execution_id: "e1".to_string(),
      step_id: "fetch".to_string(),
      attempt: 2,
      error: "boom".to_string(),
    };

    assert_eq!(
      serde_json::to_value(&event).unwrap(),
      json!({
        "event": "step_retrying",
        "execution_id": "e1",
        "step_id": "fetch",
        "attempt": 2,
        "error": "boom"
      })
    );
  }

  #[test]
  fn test_channel_notifier_survives_dropped_receiver() {
    let (tx, rx) = mpsc::unbounded_channel();
    let notifier = ChannelNotifier::new(tx);
    drop(rx);

    notifier.notify(ExecutionEvent::SkillFailed {
      execution_id: "e1".to_string(),
      error: "cancelled".to_string(),
    });
  }
}
