//! Query error types.

/// Errors raised while parsing or evaluating paths and expressions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
  /// The expression is not well-formed.
  #[error("invalid expression '{expression}' at offset {offset}: {message}")]
  Syntax {
    expression: String,
    offset: usize,
    message: String,
  },

  /// A bare identifier does not name a key of the evaluated document.
  #[error("unknown binding '{name}'")]
  UnknownBinding { name: String },
}

impl QueryError {
  pub(crate) fn syntax(expression: &str, offset: usize, message: impl Into<String>) -> Self {
    QueryError::Syntax {
      expression: expression.to_string(),
      offset,
      message: message.into(),
    }
  }

  /// Whether this error was raised at parse time.
  pub fn is_syntax(&self) -> bool {
    matches!(self, QueryError::Syntax { .. })
  }
}
