//! Repository implementations over an injected store client.
//!
//! This module provides the concrete repository types:
//!
//! - [`RepositoryBase`]: identifiers, the shared client handle and the lazy
//!   two-phase provisioning lifecycle
//! - [`ReadRepository`]: point reads, filtered fetches, counting and paging
//! - [`CrudRepository`]: the read surface plus all write operations
//! - [`DocumentQuery`]: composable, lazily evaluated query handle
//!
//! Repositories are caller-owned and hold no global state; share one by
//! wrapping it in an `Arc`. Cloning is deliberately not provided because the
//! provisioning lifecycle is per-instance.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub mod base;
pub mod crud;
pub mod error;
pub mod query;
pub mod read;

pub use base::{ProvisioningState, RepositoryBase};
pub use crud::CrudRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use query::DocumentQuery;
pub use read::ReadRepository;

use crate::store::StoreResult;

/// A storable application entity.
///
/// Write-side repositories require entities to expose their embedded
/// document id, when they carry one. Types without a natural id can rely on
/// the default and let the store assign ids:
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Order {
///     id: Option<String>,
///     name: String,
///     done: bool,
/// }
///
/// impl Entity for Order {
///     fn document_id(&self) -> Option<&str> {
///         self.id.as_deref()
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// The id embedded in this entity, if any.
    fn document_id(&self) -> Option<&str> {
        None
    }
}

/// Run a store call under a cancellation token.
///
/// A token that has already fired fails fast without dispatching the call;
/// afterwards the token races the call itself, and winning the race abandons
/// the in-flight future.
pub(crate) async fn run_cancellable<T, F>(
    cancel: &CancellationToken,
    operation: F,
) -> RepositoryResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(RepositoryError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RepositoryError::Cancelled),
        outcome = operation => outcome.map_err(RepositoryError::from),
    }
}
