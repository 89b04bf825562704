//! Skillchain Query
//!
//! The path query primitive shared by every part of the skill engine, plus the
//! restricted boolean-expression grammar used for step conditions and filter
//! selectors.
//!
//! # Paths
//!
//! ```text
//! $.input.user.email        property access
//! $['input']["user"]        bracket notation
//! $.items[0]  $.items[-1]   indexing (negative counts from the end)
//! $.items[1:3]              slices
//! $.items[*]  $.user.*      wildcards
//! $.items[0,2]              unions
//! $..email                  recursive descent
//! $.items[?(@.price < 10)]  filters
//! ```
//!
//! Malformed expressions fail at parse time with [`QueryError::Syntax`]. A
//! well-formed path that matches nothing yields an empty list.
//!
//! # Expressions
//!
//! ```text
//! input.count > 3 && fetch.status == 'ok'
//! not ($.review.approved == false) or input.force
//! ```
//!
//! Operands are literals, `$`-paths, and bare identifiers naming a top-level
//! key of the document the expression is evaluated against.

mod error;
mod expr;
mod parser;
mod path;

use serde_json::Value;

pub use error::QueryError;
pub use expr::{CompareOp, Expr, is_truthy};
pub use path::JsonPath;

/// Parse `expression` and return every match in `document`, in document order.
pub fn query<'a>(document: &'a Value, expression: &str) -> Result<Vec<&'a Value>, QueryError> {
  Ok(JsonPath::parse(expression)?.query(document))
}

/// Parse `expression` and return its first match in `document`, if any.
pub fn query_first<'a>(
  document: &'a Value,
  expression: &str,
) -> Result<Option<&'a Value>, QueryError> {
  Ok(JsonPath::parse(expression)?.first(document))
}
