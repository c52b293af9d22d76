//! Write-side capability traits.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::document::Document;
use crate::repository::RepositoryResult;
use crate::store::{CollectionInfo, CollectionSettings};

/// Insert a new item.
#[async_trait]
pub trait AddItem<T, R = Document>: Send + Sync {
    /// Insert the entity as a new document.
    ///
    /// The store assigns `id`, `_etag` and `_ts` when the entity does not
    /// carry an id; an embedded id is honored and a duplicate yields a
    /// conflict fault.
    async fn add(&self, entity: &T, cancel: &CancellationToken) -> RepositoryResult<R>;
}

/// Replace an item at an explicit key.
#[async_trait]
pub trait UpdateItem<K: ?Sized, T, R = Document>: Send + Sync {
    /// Replace the document under `id` with the entity.
    ///
    /// Fails with a not-found store fault when no document exists under that
    /// key; replacement never creates.
    async fn update(&self, id: &K, entity: &T, cancel: &CancellationToken)
        -> RepositoryResult<R>;
}

/// Replace an item addressed by its own embedded id.
#[async_trait]
pub trait UpdateEntity<T, R = Document>: Send + Sync {
    /// Replace the document whose key the entity itself carries.
    async fn update_entity(&self, entity: &T, cancel: &CancellationToken) -> RepositoryResult<R>;
}

/// Create-or-replace at an explicit key.
#[async_trait]
pub trait UpsertItem<K: ?Sized, T, R = Document>: Send + Sync {
    /// Create the document under `id`, or replace it when it exists.
    async fn upsert(&self, id: &K, entity: &T, cancel: &CancellationToken)
        -> RepositoryResult<R>;
}

/// Delete a single item.
#[async_trait]
pub trait DeleteItem<K: ?Sized>: Send + Sync {
    /// Delete the document under `id`. Missing documents are a not-found
    /// store fault.
    async fn delete(&self, id: &K, cancel: &CancellationToken) -> RepositoryResult<()>;
}

/// Drop the whole collection.
#[async_trait]
pub trait DeleteCollection: Send + Sync {
    /// Delete the backing collection and every document in it.
    ///
    /// Destructive and unscoped. Later operations on the repository fail
    /// with a store fault until the collection is provisioned again by a new
    /// repository instance.
    async fn delete_all(&self, cancel: &CancellationToken) -> RepositoryResult<()>;
}

/// Alter collection-level settings.
#[async_trait]
pub trait ReplaceCollection: Send + Sync {
    /// Replace the collection's settings, returning the updated metadata.
    async fn update_collection(
        &self,
        settings: &CollectionSettings,
        cancel: &CancellationToken,
    ) -> RepositoryResult<CollectionInfo>;
}

/// Server-side stored procedure execution.
#[async_trait]
pub trait ExecuteProcedure<R>: Send + Sync {
    /// Execute the named stored procedure and deserialize its result.
    async fn execute_stored_proc(
        &self,
        procedure_id: &str,
        parameters: Vec<Value>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<R>;
}
