//! Restricted boolean expressions.
//!
//! The grammar is deliberately small: comparisons, boolean connectives,
//! parentheses, literals and paths. There is no arithmetic, no function
//! calls, and nothing that executes code from the expression text.
//!
//! ```text
//! expr       := or
//! or         := and (("||" | "or") and)*
//! and        := not (("&&" | "and") not)*
//! not        := ("!" | "not") not | comparison
//! comparison := operand (op operand)?
//! op         := "==" | "===" | "!=" | "!==" | "<" | "<=" | ">" | ">="
//! operand    := literal | "$" path | "@" path | identifier path | "(" expr ")"
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::QueryError;
use crate::parser::Parser;
use crate::path::JsonPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl fmt::Display for CompareOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let token = match self {
      CompareOp::Eq => "==",
      CompareOp::Ne => "!=",
      CompareOp::Lt => "<",
      CompareOp::Le => "<=",
      CompareOp::Gt => ">",
      CompareOp::Ge => ">=",
    };
    f.write_str(token)
  }
}

/// A parsed boolean expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Literal(Value),
  /// Evaluates to the path's first match, or `null`.
  Path(JsonPath),
  Not(Box<Expr>),
  And(Box<Expr>, Box<Expr>),
  Or(Box<Expr>, Box<Expr>),
  Compare {
    op: CompareOp,
    left: Box<Expr>,
    right: Box<Expr>,
  },
}

/// What paths inside an expression are evaluated against.
pub(crate) struct Scope<'a> {
  /// Target of `$` and of bare identifiers.
  pub(crate) root: &'a Value,
  /// Target of `@`; only set while testing a filter candidate.
  pub(crate) current: Option<&'a Value>,
  /// Whether an unknown bare identifier is an error rather than `null`.
  pub(crate) strict: bool,
}

impl<'a> Scope<'a> {
  pub(crate) fn lenient(root: &'a Value) -> Self {
    Self {
      root,
      current: None,
      strict: false,
    }
  }
}

impl Expr {
  pub fn parse(expression: &str) -> Result<Self, QueryError> {
    Parser::new(expression).parse_expression()
  }

  /// Evaluate against `bindings`, whose top-level keys are the identifiers
  /// the expression may name.
  ///
  /// Fails with [`QueryError::UnknownBinding`] when an identifier is not a
  /// key of `bindings`. `$`-paths that match nothing evaluate to `null`.
  pub fn evaluate(&self, bindings: &Value) -> Result<Value, QueryError> {
    let scope = Scope {
      root: bindings,
      current: None,
      strict: true,
    };
    self.eval(&scope)
  }

  /// Evaluate and reduce the result to a boolean.
  pub fn test(&self, bindings: &Value) -> Result<bool, QueryError> {
    Ok(is_truthy(&self.evaluate(bindings)?))
  }

  /// Top-level keys this expression reads, in order of appearance.
  pub fn referenced_names(&self) -> Vec<&str> {
    let mut names = Vec::new();
    self.collect_names(&mut names);
    names
  }

  fn collect_names<'s>(&'s self, names: &mut Vec<&'s str>) {
    match self {
      Expr::Literal(_) => {}
      Expr::Path(path) => names.extend(path.leading_name()),
      Expr::Not(inner) => inner.collect_names(names),
      Expr::And(left, right) | Expr::Or(left, right) => {
        left.collect_names(names);
        right.collect_names(names);
      }
      Expr::Compare { left, right, .. } => {
        left.collect_names(names);
        right.collect_names(names);
      }
    }
  }

  /// Filter test: errors count as "no match".
  pub(crate) fn matches<'a>(&self, root: &'a Value, current: &'a Value) -> bool {
    let scope = Scope {
      root,
      current: Some(current),
      strict: false,
    };
    self.eval(&scope).is_ok_and(|v| is_truthy(&v))
  }

  fn eval(&self, scope: &Scope<'_>) -> Result<Value, QueryError> {
    match self {
      Expr::Literal(value) => Ok(value.clone()),
      Expr::Path(path) => Ok(
        path
          .select(scope)?
          .into_iter()
          .next()
          .cloned()
          .unwrap_or(Value::Null),
      ),
      Expr::Not(inner) => Ok(Value::Bool(!is_truthy(&inner.eval(scope)?))),
      Expr::And(left, right) => {
        if !is_truthy(&left.eval(scope)?) {
          return Ok(Value::Bool(false));
        }
        Ok(Value::Bool(is_truthy(&right.eval(scope)?)))
      }
      Expr::Or(left, right) => {
        if is_truthy(&left.eval(scope)?) {
          return Ok(Value::Bool(true));
        }
        Ok(Value::Bool(is_truthy(&right.eval(scope)?)))
      }
      Expr::Compare { op, left, right } => {
        let left = left.eval(scope)?;
        let right = right.eval(scope)?;
        Ok(Value::Bool(compare(*op, &left, &right)))
      }
    }
  }
}

impl FromStr for Expr {
  type Err = QueryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Expr::parse(s)
  }
}

/// `null`, `false`, `0` and `""` are false; everything else is true.
pub fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
    Value::String(s) => !s.is_empty(),
    Value::Array(_) | Value::Object(_) => true,
  }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
  match op {
    CompareOp::Eq => json_eq(left, right),
    CompareOp::Ne => !json_eq(left, right),
    CompareOp::Lt => ordering(left, right) == Some(Ordering::Less),
    CompareOp::Le => matches!(
      ordering(left, right),
      Some(Ordering::Less | Ordering::Equal)
    ),
    CompareOp::Gt => ordering(left, right) == Some(Ordering::Greater),
    CompareOp::Ge => matches!(
      ordering(left, right),
      Some(Ordering::Greater | Ordering::Equal)
    ),
  }
}

/// Structural equality where numbers compare by value (`1 == 1.0`).
fn json_eq(left: &Value, right: &Value) -> bool {
  match (left, right) {
    (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
      (Some(a), Some(b)) => a == b,
      _ => a == b,
    },
    (Value::Array(a), Value::Array(b)) => {
      a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_eq(x, y))
    }
    (Value::Object(a), Value::Object(b)) => {
      a.len() == b.len()
        && a
          .iter()
          .all(|(k, x)| b.get(k).is_some_and(|y| json_eq(x, y)))
    }
    _ => left == right,
  }
}

/// Ordering is only defined between two numbers or two strings.
fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
  match (left, right) {
    (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
    _ => None,
  }
}
