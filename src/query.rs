//! Query shapes and paging primitives.
//!
//! Repositories speak to the store in terms of [`StoreQuery`]: either a
//! structured [`Filter`](crate::filter::Filter), a raw [`SqlQuery`] with
//! named parameters, or a server-side [`Aggregate`]. Results come back one
//! [`Page`] at a time, addressed by an opaque [`ContinuationToken`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::Filter;

/// A named query parameter, referenced as `@name` in the query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: Value,
}

impl SqlParameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A raw store query with named parameters.
///
/// # Example
/// ```
/// use docstore::query::SqlQuery;
///
/// let query = SqlQuery::new("SELECT * FROM c WHERE c.done = @done")
///     .with_parameter("@done", false);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQuery {
    pub text: String,
    pub parameters: Vec<SqlParameter>,
}

impl SqlQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push(SqlParameter::new(name, value));
        self
    }
}

/// Server-side aggregate queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Exact document count of the collection, returned as a single scalar
    /// row regardless of page size.
    Count,
}

/// The query shape handed to the store client.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreQuery {
    Filter(Filter),
    Sql(SqlQuery),
    Aggregate(Aggregate),
}

/// Opaque marker for where the next page begins.
///
/// Tokens are produced by the store and must be passed back unmodified; their
/// content is an implementation detail of the store client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Paging controls for a single query round-trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOptions {
    /// Upper bound on returned items; `None` means the store default.
    pub max_items: Option<u32>,
    /// Items to skip before the first page. Ignored once a continuation
    /// token is present, since the token already encodes the position.
    pub skip: Option<u32>,
    /// Resume position from a previous page.
    pub continuation: Option<ContinuationToken>,
}

/// One page of typed query results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token for the next page; absent when the result set is exhausted.
    pub continuation: Option<ContinuationToken>,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a further page can be requested.
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }
}
