//! Recursive-descent parser for paths and expressions.
//!
//! Paths and expressions share one cursor: filter selectors embed an
//! expression inside a path, and expression operands embed paths.

use std::num::IntErrorKind;

use serde_json::Value;

use crate::error::QueryError;
use crate::expr::{CompareOp, Expr};
use crate::path::{JsonPath, PathRoot, Segment, Selector};

/// Comparison tokens, longest first so `===` wins over `==`.
const COMPARE_OPS: [(&str, CompareOp); 8] = [
  ("===", CompareOp::Eq),
  ("!==", CompareOp::Ne),
  ("==", CompareOp::Eq),
  ("!=", CompareOp::Ne),
  ("<=", CompareOp::Le),
  (">=", CompareOp::Ge),
  ("<", CompareOp::Lt),
  (">", CompareOp::Gt),
];

/// Limit on nested groups, negations, filters and chained operators. Keeps
/// both parsing and evaluation recursion bounded.
const MAX_DEPTH: usize = 128;

pub(crate) struct Parser<'a> {
  src: &'a str,
  pos: usize,
  filter_depth: usize,
  depth: usize,
}

impl<'a> Parser<'a> {
  pub(crate) fn new(src: &'a str) -> Self {
    Self {
      src,
      pos: 0,
      filter_depth: 0,
      depth: 0,
    }
  }

  /// Parse a complete `$`-rooted path.
  pub(crate) fn parse_path(mut self) -> Result<JsonPath, QueryError> {
    self.skip_ws();
    let start = self.pos;
    if !self.eat('$') {
      return Err(self.error("path must start with '$'"));
    }
    let segments = self.parse_segments()?;
    let path = JsonPath::new(self.src[start..self.pos].to_string(), PathRoot::Root, segments);
    self.finish()?;
    Ok(path)
  }

  /// Parse a complete boolean expression.
  pub(crate) fn parse_expression(mut self) -> Result<Expr, QueryError> {
    let expr = self.parse_or()?;
    self.finish()?;
    Ok(expr)
  }

  fn finish(&mut self) -> Result<(), QueryError> {
    self.skip_ws();
    if self.pos < self.src.len() {
      return Err(self.error("unexpected trailing input"));
    }
    Ok(())
  }

  // ---------------------------------------------------------------------------
  // Paths
  // ---------------------------------------------------------------------------

  fn parse_segments(&mut self) -> Result<Vec<Segment>, QueryError> {
    let mut segments = Vec::new();

    loop {
      if self.eat_str("..") {
        let selector = if self.eat('*') {
          Selector::Wildcard
        } else if self.peek() == Some('[') {
          self.parse_bracket()?
        } else {
          Selector::Name(self.parse_name()?)
        };
        segments.push(Segment::Descendant(selector));
      } else if self.eat('.') {
        let selector = if self.eat('*') {
          Selector::Wildcard
        } else {
          Selector::Name(self.parse_name()?)
        };
        segments.push(Segment::Child(selector));
      } else if self.peek() == Some('[') {
        segments.push(Segment::Child(self.parse_bracket()?));
      } else {
        return Ok(segments);
      }
    }
  }

  fn parse_name(&mut self) -> Result<String, QueryError> {
    let start = self.pos;
    while matches!(self.peek(), Some(c) if is_name_char(c)) {
      self.bump();
    }
    if self.pos == start {
      return Err(self.error("expected a property name"));
    }
    Ok(self.src[start..self.pos].to_string())
  }

  fn parse_bracket(&mut self) -> Result<Selector, QueryError> {
    self.expect('[')?;
    self.skip_ws();

    let selector = if self.eat('*') {
      Selector::Wildcard
    } else if self.eat('?') {
      self.descend()?;
      self.filter_depth += 1;
      let expr = self.parse_or();
      self.filter_depth -= 1;
      self.ascend(1);
      Selector::Filter(Box::new(expr?))
    } else {
      let first = self.parse_union_member()?;
      self.skip_ws();
      if self.peek() == Some(',') {
        let mut members = vec![first];
        while self.eat(',') {
          self.skip_ws();
          members.push(self.parse_union_member()?);
          self.skip_ws();
        }
        Selector::Union(members)
      } else {
        first
      }
    };

    self.skip_ws();
    self.expect(']')?;
    Ok(selector)
  }

  fn parse_union_member(&mut self) -> Result<Selector, QueryError> {
    match self.peek() {
      Some('\'') | Some('"') => Ok(Selector::Name(self.parse_string()?)),
      Some(':') => self.parse_slice(None),
      Some(c) if c == '-' || c.is_ascii_digit() => {
        let index = self.parse_integer()?;
        self.skip_ws();
        if self.peek() == Some(':') {
          self.parse_slice(Some(index))
        } else {
          Ok(Selector::Index(index))
        }
      }
      _ => Err(self.error("expected a quoted name, index, slice, '*' or filter")),
    }
  }

  fn parse_slice(&mut self, start: Option<i64>) -> Result<Selector, QueryError> {
    self.expect(':')?;
    self.skip_ws();
    let end = if matches!(self.peek(), Some(c) if c == '-' || c.is_ascii_digit()) {
      Some(self.parse_integer()?)
    } else {
      None
    };
    Ok(Selector::Slice { start, end })
  }

  fn parse_integer(&mut self) -> Result<i64, QueryError> {
    let start = self.pos;
    self.eat('-');
    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
      self.bump();
    }
    // Out-of-range indices saturate and simply match nothing.
    match self.src[start..self.pos].parse::<i64>() {
      Ok(n) => Ok(n),
      Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(i64::MAX),
      Err(e) if *e.kind() == IntErrorKind::NegOverflow => Ok(i64::MIN),
      Err(_) => Err(QueryError::syntax(self.src, start, "expected an integer")),
    }
  }

  fn parse_string(&mut self) -> Result<String, QueryError> {
    let start = self.pos;
    let quote = match self.bump() {
      Some(q @ ('\'' | '"')) => q,
      _ => return Err(QueryError::syntax(self.src, start, "expected a quoted string")),
    };

    let mut out = String::new();
    loop {
      match self.bump() {
        None => return Err(QueryError::syntax(self.src, start, "unterminated string")),
        Some(c) if c == quote => return Ok(out),
        Some('\\') => match self.bump() {
          Some('n') => out.push('\n'),
          Some('t') => out.push('\t'),
          Some(c) => out.push(c),
          None => return Err(QueryError::syntax(self.src, start, "unterminated string")),
        },
        Some(c) => out.push(c),
      }
    }
  }

  // ---------------------------------------------------------------------------
  // Expressions
  // ---------------------------------------------------------------------------

  // Chains build left-nested trees, so each operator counts as one level.

  fn parse_or(&mut self) -> Result<Expr, QueryError> {
    let mut left = self.parse_and()?;
    let mut levels = 0;
    loop {
      self.skip_ws();
      if self.eat_str("||") || self.eat_keyword("or") {
        self.descend()?;
        levels += 1;
        let right = self.parse_and()?;
        left = Expr::Or(Box::new(left), Box::new(right));
      } else {
        self.ascend(levels);
        return Ok(left);
      }
    }
  }

  fn parse_and(&mut self) -> Result<Expr, QueryError> {
    let mut left = self.parse_not()?;
    let mut levels = 0;
    loop {
      self.skip_ws();
      if self.eat_str("&&") || self.eat_keyword("and") {
        self.descend()?;
        levels += 1;
        let right = self.parse_not()?;
        left = Expr::And(Box::new(left), Box::new(right));
      } else {
        self.ascend(levels);
        return Ok(left);
      }
    }
  }

  fn parse_not(&mut self) -> Result<Expr, QueryError> {
    self.skip_ws();
    let negated = if self.peek() == Some('!') && self.peek_second() != Some('=') {
      self.bump();
      true
    } else {
      self.eat_keyword("not")
    };
    if !negated {
      return self.parse_comparison();
    }

    self.descend()?;
    let inner = self.parse_not()?;
    self.ascend(1);
    Ok(Expr::Not(Box::new(inner)))
  }

  fn parse_comparison(&mut self) -> Result<Expr, QueryError> {
    let left = self.parse_operand()?;
    self.skip_ws();

    let Some(op) = self.parse_compare_op() else {
      return Ok(left);
    };

    let right = self.parse_operand()?;
    Ok(Expr::Compare {
      op,
      left: Box::new(left),
      right: Box::new(right),
    })
  }

  fn parse_compare_op(&mut self) -> Option<CompareOp> {
    COMPARE_OPS
      .iter()
      .find(|(token, _)| self.rest().starts_with(token))
      .map(|(token, op)| {
        self.pos += token.len();
        *op
      })
  }

  fn parse_operand(&mut self) -> Result<Expr, QueryError> {
    self.skip_ws();
    let start = self.pos;

    match self.peek() {
      Some('(') => {
        self.bump();
        self.descend()?;
        let expr = self.parse_or()?;
        self.ascend(1);
        self.skip_ws();
        self.expect(')')?;
        Ok(expr)
      }
      Some('$') => {
        self.bump();
        let segments = self.parse_segments()?;
        Ok(Expr::Path(JsonPath::new(
          self.src[start..self.pos].to_string(),
          PathRoot::Root,
          segments,
        )))
      }
      Some('@') => {
        if self.filter_depth == 0 {
          return Err(self.error("'@' is only valid inside a filter"));
        }
        self.bump();
        let segments = self.parse_segments()?;
        Ok(Expr::Path(JsonPath::new(
          self.src[start..self.pos].to_string(),
          PathRoot::Current,
          segments,
        )))
      }
      Some('\'') | Some('"') => Ok(Expr::Literal(Value::String(self.parse_string()?))),
      Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
      Some(c) if c.is_alphabetic() || c == '_' => {
        let name = self.parse_name()?;
        match name.as_str() {
          "true" => Ok(Expr::Literal(Value::Bool(true))),
          "false" => Ok(Expr::Literal(Value::Bool(false))),
          "null" => Ok(Expr::Literal(Value::Null)),
          "and" | "or" | "not" => Err(QueryError::syntax(
            self.src,
            start,
            format!("unexpected keyword '{}'", name),
          )),
          _ => {
            let segments = self.parse_segments()?;
            Ok(Expr::Path(JsonPath::new(
              self.src[start..self.pos].to_string(),
              PathRoot::Binding(name),
              segments,
            )))
          }
        }
      }
      Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
      None => Err(self.error("unexpected end of expression")),
    }
  }

  fn parse_number(&mut self) -> Result<Expr, QueryError> {
    let start = self.pos;
    self.eat('-');
    self.skip_digits();
    if self.peek() == Some('.') && matches!(self.peek_second(), Some(c) if c.is_ascii_digit()) {
      self.bump();
      self.skip_digits();
    }
    if matches!(self.peek(), Some('e' | 'E')) {
      self.bump();
      if !self.eat('+') {
        self.eat('-');
      }
      self.skip_digits();
    }

    match serde_json::from_str::<Value>(&self.src[start..self.pos]) {
      Ok(number @ Value::Number(_)) => Ok(Expr::Literal(number)),
      _ => Err(QueryError::syntax(self.src, start, "invalid number")),
    }
  }

  // ---------------------------------------------------------------------------
  // Cursor
  // ---------------------------------------------------------------------------

  fn descend(&mut self) -> Result<(), QueryError> {
    if self.depth >= MAX_DEPTH {
      return Err(self.error(format!("nesting exceeds {MAX_DEPTH} levels")));
    }
    self.depth += 1;
    Ok(())
  }

  fn ascend(&mut self, levels: usize) {
    self.depth -= levels;
  }

  fn rest(&self) -> &'a str {
    &self.src[self.pos..]
  }

  fn peek(&self) -> Option<char> {
    self.rest().chars().next()
  }

  fn peek_second(&self) -> Option<char> {
    self.rest().chars().nth(1)
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += c.len_utf8();
    Some(c)
  }

  fn eat(&mut self, expected: char) -> bool {
    if self.peek() == Some(expected) {
      self.pos += expected.len_utf8();
      true
    } else {
      false
    }
  }

  fn eat_str(&mut self, expected: &str) -> bool {
    if self.rest().starts_with(expected) {
      self.pos += expected.len();
      true
    } else {
      false
    }
  }

  /// Consume `keyword` only when it is not the prefix of a longer name.
  fn eat_keyword(&mut self, keyword: &str) -> bool {
    let rest = self.rest();
    if !rest.starts_with(keyword) {
      return false;
    }
    if rest[keyword.len()..].chars().next().is_some_and(is_name_char) {
      return false;
    }
    self.pos += keyword.len();
    true
  }

  fn expect(&mut self, expected: char) -> Result<(), QueryError> {
    if self.eat(expected) {
      Ok(())
    } else {
      Err(self.error(format!("expected '{}'", expected)))
    }
  }

  fn skip_ws(&mut self) {
    while matches!(self.peek(), Some(c) if c.is_whitespace()) {
      self.bump();
    }
  }

  fn skip_digits(&mut self) {
    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
      self.bump();
    }
  }

  fn error(&self, message: impl Into<String>) -> QueryError {
    QueryError::syntax(self.src, self.pos, message)
  }
}

/// Characters allowed in dot-notation names and bare identifiers.
fn is_name_char(c: char) -> bool {
  c.is_alphanumeric() || c == '_' || c == '-'
}
