use serde::{Deserialize, Serialize};

/// How a step failure affects the rest of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandling {
  /// Abort the remaining steps.
  #[default]
  Stop,
  /// Record the failure and move on to the next step.
  Continue,
  /// Re-attempt the step, then behave like `Continue` once attempts run out.
  Retry,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryBackoff {
  #[default]
  Constant,
  Linear,
  Exponential,
}

impl RetryBackoff {
  /// Delay before the given re-attempt (1-based), in milliseconds.
  pub fn delay_ms(self, initial_delay_ms: u64, retry: u32) -> u64 {
    let retry = retry.max(1);
    match self {
      RetryBackoff::Constant => initial_delay_ms,
      RetryBackoff::Linear => initial_delay_ms.saturating_mul(u64::from(retry)),
      RetryBackoff::Exponential => {
        let factor = 1u64.checked_shl(retry - 1).unwrap_or(u64::MAX);
        initial_delay_ms.saturating_mul(factor)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_handling_defaults_to_stop() {
    assert_eq!(ErrorHandling::default(), ErrorHandling::Stop);
  }

  #[test]
  fn test_backoff_delays() {
    assert_eq!(RetryBackoff::Constant.delay_ms(100, 3), 100);
    assert_eq!(RetryBackoff::Linear.delay_ms(100, 3), 300);
    assert_eq!(RetryBackoff::Exponential.delay_ms(100, 1), 100);
    assert_eq!(RetryBackoff::Exponential.delay_ms(100, 3), 400);
  }

  #[test]
  fn test_exponential_backoff_saturates() {
    assert_eq!(RetryBackoff::Exponential.delay_ms(10, 200), u64::MAX);
  }
}
