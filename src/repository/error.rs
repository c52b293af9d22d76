//! Error types for repository operations.

use thiserror::Error;

use crate::store::StoreError;

/// Convenience alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors surfaced by repository operations.
///
/// Store faults pass through unchanged so callers can react to the precise
/// fault (throttling, conflict, missing collection) without unwrapping layers
/// of translation. The repository adds only its own concerns on top.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A fault reported by the store client, propagated intact.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation's cancellation token fired before or during the call.
    #[error("operation cancelled")]
    Cancelled,

    /// Provisioning of the backing database or collection failed. Terminal
    /// for the repository instance; every later `ready` call returns the
    /// memoized failure.
    #[error("provisioning failed for '{database}/{collection}'")]
    ProvisioningFailed {
        database: String,
        collection: String,
        #[source]
        source: StoreError,
    },

    /// Entity or document (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The entity cannot be used for the requested operation.
    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    /// Settings could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl RepositoryError {
    /// The underlying store fault, when this error wraps one.
    pub fn as_store(&self) -> Option<&StoreError> {
        match self {
            RepositoryError::Store(fault) => Some(fault),
            RepositoryError::ProvisioningFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RepositoryError::Cancelled)
    }
}
