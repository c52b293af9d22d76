//! Store client fault taxonomy.

use std::fmt;

use thiserror::Error;

/// Convenience alias for store client operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The kind of resource a [`StoreError::NotFound`] refers to.
///
/// Repositories care about the distinction: a missing *document* on a point
/// read converts to an empty result, while a missing *collection* is a real
/// fault that must surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Database,
    Collection,
    Document,
    Procedure,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Database => "database",
            ResourceKind::Collection => "collection",
            ResourceKind::Document => "document",
            ResourceKind::Procedure => "stored procedure",
        };
        f.write_str(name)
    }
}

/// Faults reported by a store client.
///
/// `Clone` is required so a provisioning failure can be memoized and
/// re-returned on later calls.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("{kind} not found: {path}")]
    NotFound { kind: ResourceKind, path: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("request rate too large, retry after {retry_after_ms} ms")]
    Throttled { retry_after_ms: u64 },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("store internal error: {0}")]
    Server(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl StoreError {
    pub fn database_not_found(path: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind: ResourceKind::Database,
            path: path.into(),
        }
    }

    pub fn collection_not_found(path: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind: ResourceKind::Collection,
            path: path.into(),
        }
    }

    pub fn document_not_found(path: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind: ResourceKind::Document,
            path: path.into(),
        }
    }

    pub fn procedure_not_found(path: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind: ResourceKind::Procedure,
            path: path.into(),
        }
    }

    /// Whether this is a not-found fault of any resource kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Whether this is a not-found fault for a document specifically.
    pub fn is_document_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound {
                kind: ResourceKind::Document,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_kinds() {
        let document = StoreError::document_not_found("dbs/shop/colls/orders/docs/x");
        assert!(document.is_not_found());
        assert!(document.is_document_not_found());

        let collection = StoreError::collection_not_found("dbs/shop/colls/orders");
        assert!(collection.is_not_found());
        assert!(!collection.is_document_not_found());
    }

    #[test]
    fn test_display_includes_kind() {
        let fault = StoreError::collection_not_found("dbs/shop/colls/orders");
        assert_eq!(fault.to_string(), "collection not found: dbs/shop/colls/orders");
    }
}
