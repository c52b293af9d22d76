//! Predicate filters for document queries.
//!
//! Filters are plain data: repositories hand them to the store client, which
//! translates them into its native query form. The [`Filter::matches`]
//! evaluator implements the reference semantics and backs the in-memory
//! store.
//!
//! # Example
//! ```
//! use docstore::filter::field;
//!
//! let filter = field("done").eq(false).and(field("total").gt(10));
//! ```

use serde_json::Value;

use crate::document::Document;

/// Comparison operator of a [`Filter::Compare`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A composable document predicate.
///
/// Comparisons against a missing field never match, regardless of operator;
/// this mirrors how document stores treat undefined fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Compare the field at `path` (dotted) against a value.
    Compare {
        path: String,
        op: CompareOp,
        value: Value,
    },
    /// Substring match on strings, element match on arrays.
    Contains { path: String, value: Value },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

/// Start a filter on a document field, e.g. `field("customer.city")`.
pub fn field(path: impl Into<String>) -> FieldRef {
    FieldRef { path: path.into() }
}

/// Builder handle produced by [`field`].
pub struct FieldRef {
    path: String,
}

impl FieldRef {
    pub fn eq(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Ne, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Gt, value)
    }

    pub fn gte(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Ge, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Lt, value)
    }

    pub fn lte(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Le, value)
    }

    /// Substring match when the field is a string, element match when it is
    /// an array.
    pub fn contains(self, value: impl Into<Value>) -> Filter {
        Filter::Contains {
            path: self.path,
            value: value.into(),
        }
    }

    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Filter {
        Filter::Compare {
            path: self.path,
            op,
            value: value.into(),
        }
    }
}

impl Filter {
    /// The match-everything filter.
    pub fn all() -> Self {
        Filter::All
    }

    /// Conjunction. Flattens nested `and` chains.
    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Disjunction. Flattens nested `or` chains.
    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut parts) => {
                parts.push(other);
                Filter::Or(parts)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    /// Negation.
    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Compare { path, op, value } => match document.get(path) {
                Some(actual) => compare(actual, *op, value),
                None => false,
            },
            Filter::Contains { path, value } => match document.get(path) {
                Some(Value::String(actual)) => value
                    .as_str()
                    .map(|needle| actual.contains(needle))
                    .unwrap_or(false),
                Some(Value::Array(elements)) => elements.contains(value),
                _ => false,
            },
            Filter::And(parts) => parts.iter().all(|part| part.matches(document)),
            Filter::Or(parts) => parts.iter().any(|part| part.matches(document)),
            Filter::Not(inner) => !inner.matches(document),
        }
    }
}

fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(actual, expected),
        CompareOp::Ne => !values_equal(actual, expected),
        CompareOp::Gt | CompareOp::Ge | CompareOp::Lt | CompareOp::Le => {
            let ordering = match (actual, expected) {
                (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => None,
                },
                (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
                _ => None,
            };
            match ordering {
                Some(ordering) => match op {
                    CompareOp::Gt => ordering.is_gt(),
                    CompareOp::Ge => ordering.is_ge(),
                    CompareOp::Lt => ordering.is_lt(),
                    CompareOp::Le => ordering.is_le(),
                    _ => unreachable!(),
                },
                None => false,
            }
        }
    }
}

/// Equality with numeric widening, so `3` and `3.0` compare equal.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => left == right,
    }
}
