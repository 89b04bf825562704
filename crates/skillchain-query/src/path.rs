//! JSONPath-style queries.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::QueryError;
use crate::expr::{Expr, Scope};
use crate::parser::Parser;

/// Where a path starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PathRoot {
  /// `$`, the document being queried.
  Root,
  /// `@`, the element under test inside a filter.
  Current,
  /// A bare identifier naming a top-level key of the document.
  Binding(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
  /// `.name`, `[...]`
  Child(Selector),
  /// `..name`, `..[...]`
  Descendant(Selector),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Selector {
  Name(String),
  Index(i64),
  Slice { start: Option<i64>, end: Option<i64> },
  Wildcard,
  Union(Vec<Selector>),
  Filter(Box<Expr>),
}

/// A parsed path expression.
///
/// Parse once, query many times:
///
/// ```
/// use serde_json::json;
/// use skillchain_query::JsonPath;
///
/// let path = JsonPath::parse("$.users[?(@.active)].name").unwrap();
/// let doc = json!({ "users": [
///   { "name": "ada", "active": true },
///   { "name": "bob", "active": false },
/// ]});
/// assert_eq!(path.query(&doc), vec![&json!("ada")]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
  source: String,
  root: PathRoot,
  segments: Vec<Segment>,
}

impl JsonPath {
  pub(crate) fn new(source: String, root: PathRoot, segments: Vec<Segment>) -> Self {
    Self {
      source,
      root,
      segments,
    }
  }

  /// Parse a `$`-rooted path expression.
  pub fn parse(expression: &str) -> Result<Self, QueryError> {
    Parser::new(expression).parse_path()
  }

  /// The expression text this path was parsed from.
  pub fn as_str(&self) -> &str {
    &self.source
  }

  /// Every match in `document`, in document order. No match is an empty list.
  pub fn query<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
    self.select(&Scope::lenient(document)).unwrap_or_default()
  }

  /// The first match in `document`, if any.
  pub fn first<'a>(&self, document: &'a Value) -> Option<&'a Value> {
    self.query(document).into_iter().next()
  }

  /// The top-level key this path reads from, when it starts with a plain name.
  ///
  /// `$.fetch.body` and `fetch.body` both lead with `fetch`.
  pub fn leading_name(&self) -> Option<&str> {
    match &self.root {
      PathRoot::Binding(name) => Some(name),
      PathRoot::Root => match self.segments.first() {
        Some(Segment::Child(Selector::Name(name))) => Some(name),
        _ => None,
      },
      PathRoot::Current => None,
    }
  }

  pub(crate) fn select<'a>(&self, scope: &Scope<'a>) -> Result<Vec<&'a Value>, QueryError> {
    let start = match &self.root {
      PathRoot::Root => scope.root,
      PathRoot::Current => match scope.current {
        Some(current) => current,
        None => return Ok(Vec::new()),
      },
      PathRoot::Binding(name) => match scope.root.get(name.as_str()) {
        Some(value) => value,
        None if scope.strict => {
          return Err(QueryError::UnknownBinding { name: name.clone() });
        }
        None => return Ok(Vec::new()),
      },
    };

    let mut current = vec![start];
    for segment in &self.segments {
      let mut next = Vec::new();
      for value in current {
        segment.apply(value, scope.root, &mut next);
      }
      current = next;
    }

    Ok(current)
  }
}

impl FromStr for JsonPath {
  type Err = QueryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    JsonPath::parse(s)
  }
}

impl fmt::Display for JsonPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.source)
  }
}

impl Segment {
  fn apply<'a>(&self, value: &'a Value, root: &'a Value, out: &mut Vec<&'a Value>) {
    match self {
      Segment::Child(selector) => selector.select(value, root, out),
      Segment::Descendant(selector) => {
        visit_tree(value, &mut |node| selector.select(node, root, out));
      }
    }
  }
}

impl Selector {
  fn select<'a>(&self, value: &'a Value, root: &'a Value, out: &mut Vec<&'a Value>) {
    match self {
      Selector::Name(name) => match value {
        Value::Object(map) => out.extend(map.get(name)),
        // `items.0` reads like `items[0]`
        Value::Array(items) => {
          if let Ok(index) = name.parse::<usize>() {
            out.extend(items.get(index));
          }
        }
        _ => {}
      },
      Selector::Index(index) => {
        if let Value::Array(items) = value {
          if let Some(i) = normalize_index(*index, items.len()) {
            out.push(&items[i]);
          }
        }
      }
      Selector::Slice { start, end } => {
        if let Value::Array(items) = value {
          let len = items.len();
          let from = start.map_or(0, |i| clamp_bound(i, len));
          let to = end.map_or(len, |i| clamp_bound(i, len));
          if from < to {
            out.extend(&items[from..to]);
          }
        }
      }
      Selector::Wildcard => out.extend(children(value)),
      Selector::Union(members) => {
        for member in members {
          member.select(value, root, out);
        }
      }
      Selector::Filter(expr) => {
        for child in children(value) {
          if expr.matches(root, child) {
            out.push(child);
          }
        }
      }
    }
  }
}

fn children(value: &Value) -> Vec<&Value> {
  match value {
    Value::Array(items) => items.iter().collect(),
    Value::Object(map) => map.values().collect(),
    _ => Vec::new(),
  }
}

/// Pre-order walk over `value` and everything beneath it.
fn visit_tree<'a>(value: &'a Value, visit: &mut dyn FnMut(&'a Value)) {
  visit(value);
  for child in children(value) {
    visit_tree(child, visit);
  }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
  if index >= 0 {
    let i = usize::try_from(index).ok()?;
    (i < len).then_some(i)
  } else {
    let back = usize::try_from(index.unsigned_abs()).ok()?;
    (back <= len).then(|| len - back)
  }
}

fn clamp_bound(index: i64, len: usize) -> usize {
  let len_i = i64::try_from(len).unwrap_or(i64::MAX);
  let resolved = if index < 0 { len_i + index } else { index };
  usize::try_from(resolved.clamp(0, len_i)).unwrap_or(0)
}
