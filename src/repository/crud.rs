//! Read-write repository.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::{RepositoryError, RepositoryResult};
use super::read::ReadRepository;
use super::run_cancellable;
use super::Entity;
use crate::contracts::{
    AddItem, CountAll, CountMatching, DeleteCollection, DeleteItem, DescribeCollection,
    ExecuteProcedure, FetchByKey, FetchMatching, FetchPage, Queryable, ReplaceCollection,
    UpdateEntity, UpdateItem, UpsertItem,
};
use crate::document::Document;
use crate::filter::Filter;
use crate::query::{ContinuationToken, Page, SqlQuery};
use crate::repository::DocumentQuery;
use crate::store::{CollectionInfo, CollectionSettings, DocumentStore, RequestOptions};

/// Read-write repository over one collection.
///
/// Wraps a [`ReadRepository`] and adds the write surface, so one instance
/// satisfies the full [`CrudRepositoryContract`](crate::contracts::CrudRepositoryContract).
/// Dereferences to the read side (and transitively to
/// [`RepositoryBase`](super::RepositoryBase)).
pub struct CrudRepository<T> {
    read: ReadRepository<T>,
}

impl<T: Entity> CrudRepository<T> {
    /// Create a read-write repository. Performs no I/O; see
    /// [`RepositoryBase::ready`](super::RepositoryBase::ready) for
    /// provisioning.
    pub fn new(
        database_id: impl Into<String>,
        collection_id: impl Into<String>,
        client: Arc<dyn DocumentStore>,
        options: Option<RequestOptions>,
    ) -> Self {
        Self {
            read: ReadRepository::new(database_id, collection_id, client, options),
        }
    }
}

impl<T> Deref for CrudRepository<T> {
    type Target = ReadRepository<T>;

    fn deref(&self) -> &ReadRepository<T> {
        &self.read
    }
}

// ==================== Write Capabilities ====================

#[async_trait]
impl<T: Entity> AddItem<T> for CrudRepository<T> {
    async fn add(&self, entity: &T, cancel: &CancellationToken) -> RepositoryResult<Document> {
        let document = Document::from_entity(entity)?;
        debug!("creating document in '{}'", self.collection_link().path());
        run_cancellable(
            cancel,
            self.client()
                .create(self.collection_link(), document, self.request_options()),
        )
        .await
    }
}

#[async_trait]
impl<T: Entity> UpdateItem<str, T> for CrudRepository<T> {
    async fn update(
        &self,
        id: &str,
        entity: &T,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Document> {
        let document = Document::from_entity(entity)?;
        let link = self.collection_link().document(id);
        debug!("replacing document '{}'", link.path());
        run_cancellable(
            cancel,
            self.client().replace(&link, document, self.request_options()),
        )
        .await
    }
}

#[async_trait]
impl<T: Entity> UpdateEntity<T> for CrudRepository<T> {
    async fn update_entity(
        &self,
        entity: &T,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Document> {
        let id = entity.document_id().ok_or_else(|| {
            RepositoryError::InvalidEntity("entity carries no document id".to_string())
        })?;
        self.update(id, entity, cancel).await
    }
}

#[async_trait]
impl<T: Entity> UpsertItem<str, T> for CrudRepository<T> {
    async fn upsert(
        &self,
        id: &str,
        entity: &T,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Document> {
        let document = Document::from_entity(entity)?;
        let link = self.collection_link().document(id);
        debug!("upserting document '{}'", link.path());
        run_cancellable(
            cancel,
            self.client().upsert(&link, document, self.request_options()),
        )
        .await
    }
}

#[async_trait]
impl<T: Entity> DeleteItem<str> for CrudRepository<T> {
    async fn delete(&self, id: &str, cancel: &CancellationToken) -> RepositoryResult<()> {
        let link = self.collection_link().document(id);
        debug!("deleting document '{}'", link.path());
        run_cancellable(
            cancel,
            self.client().delete(&link, self.request_options()),
        )
        .await
    }
}

#[async_trait]
impl<T: Entity> DeleteCollection for CrudRepository<T> {
    async fn delete_all(&self, cancel: &CancellationToken) -> RepositoryResult<()> {
        info!("deleting collection '{}'", self.collection_link().path());
        run_cancellable(
            cancel,
            self.client()
                .delete_collection(self.collection_link(), self.request_options()),
        )
        .await
    }
}

#[async_trait]
impl<T: Entity> ReplaceCollection for CrudRepository<T> {
    async fn update_collection(
        &self,
        settings: &CollectionSettings,
        cancel: &CancellationToken,
    ) -> RepositoryResult<CollectionInfo> {
        info!("replacing settings of '{}'", self.collection_link().path());
        run_cancellable(
            cancel,
            self.client()
                .replace_collection(self.collection_link(), settings, self.request_options()),
        )
        .await
    }
}

#[async_trait]
impl<T: Entity> ExecuteProcedure<T> for CrudRepository<T> {
    async fn execute_stored_proc(
        &self,
        procedure_id: &str,
        parameters: Vec<Value>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<T> {
        let link = self.collection_link().procedure(procedure_id);
        debug!("executing stored procedure '{}'", link.path());
        let result = run_cancellable(
            cancel,
            self.client()
                .execute_stored_procedure(&link, parameters, self.request_options()),
        )
        .await?;
        Ok(serde_json::from_value(result)?)
    }
}

// ==================== Read Capabilities (delegated) ====================

#[async_trait]
impl<T: Entity> FetchByKey<str, T> for CrudRepository<T> {
    async fn get(&self, id: &str, cancel: &CancellationToken) -> RepositoryResult<Option<T>> {
        self.read.get(id, cancel).await
    }
}

#[async_trait]
impl<T: Entity> FetchMatching<T> for CrudRepository<T> {
    async fn get_all(
        &self,
        filter: &Filter,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<T>> {
        self.read.get_all(filter, cancel).await
    }
}

#[async_trait]
impl<T: Entity> FetchPage<T> for CrudRepository<T> {
    async fn query_page(
        &self,
        filter: &Filter,
        continuation: Option<&ContinuationToken>,
        take: Option<u32>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Page<T>> {
        self.read.query_page(filter, continuation, take, cancel).await
    }
}

#[async_trait]
impl<T: Entity> CountMatching for CrudRepository<T> {
    async fn count_matching(
        &self,
        filter: &Filter,
        cancel: &CancellationToken,
    ) -> RepositoryResult<u64> {
        self.read.count_matching(filter, cancel).await
    }
}

#[async_trait]
impl<T: Entity> CountAll for CrudRepository<T> {
    async fn count(&self, cancel: &CancellationToken) -> RepositoryResult<u64> {
        self.read.count(cancel).await
    }
}

#[async_trait]
impl<T: Entity> DescribeCollection for CrudRepository<T> {
    async fn collection_info(&self, cancel: &CancellationToken) -> RepositoryResult<CollectionInfo> {
        self.read.collection_info(cancel).await
    }
}

impl<T: Entity> Queryable<T> for CrudRepository<T> {
    fn query(&self) -> DocumentQuery<T> {
        self.read.query()
    }

    fn query_raw(&self, sql: SqlQuery) -> DocumentQuery<T> {
        self.read.query_raw(sql)
    }
}
