//! Read-only repository.

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::base::RepositoryBase;
use super::error::{RepositoryError, RepositoryResult};
use super::query::DocumentQuery;
use super::run_cancellable;
use crate::contracts::{
    CountAll, CountMatching, DescribeCollection, FetchByKey, FetchMatching, FetchPage, Queryable,
};
use crate::filter::Filter;
use crate::query::{Aggregate, ContinuationToken, Page, PageOptions, SqlQuery, StoreQuery};
use crate::store::{CollectionInfo, DocumentStore, QueryPage, RequestOptions};

/// Read-only repository over one collection.
///
/// Dereferences to [`RepositoryBase`] for identity, options and the
/// provisioning lifecycle. All read operations are stateless round-trips;
/// nothing is cached.
pub struct ReadRepository<T> {
    base: RepositoryBase,
    marker: PhantomData<fn() -> T>,
}

impl<T> ReadRepository<T>
where
    T: DeserializeOwned + Send + Sync,
{
    /// Create a read-only repository. Performs no I/O; see
    /// [`RepositoryBase::ready`] for provisioning.
    pub fn new(
        database_id: impl Into<String>,
        collection_id: impl Into<String>,
        client: Arc<dyn DocumentStore>,
        options: Option<RequestOptions>,
    ) -> Self {
        Self {
            base: RepositoryBase::new(database_id, collection_id, client, options),
            marker: PhantomData,
        }
    }

    async fn run_query(
        &self,
        query: &StoreQuery,
        page: &PageOptions,
        cancel: &CancellationToken,
    ) -> RepositoryResult<QueryPage> {
        run_cancellable(
            cancel,
            self.base.client().query(
                self.base.collection_link(),
                query,
                page,
                self.base.request_options(),
            ),
        )
        .await
    }

    fn typed_items(items: Vec<Value>) -> RepositoryResult<Vec<T>> {
        items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(RepositoryError::from))
            .collect()
    }
}

impl<T> Deref for ReadRepository<T> {
    type Target = RepositoryBase;

    fn deref(&self) -> &RepositoryBase {
        &self.base
    }
}

#[async_trait]
impl<T> FetchByKey<str, T> for ReadRepository<T>
where
    T: DeserializeOwned + Send + Sync,
{
    async fn get(&self, id: &str, cancel: &CancellationToken) -> RepositoryResult<Option<T>> {
        let link = self.base.collection_link().document(id);
        debug!("point read '{}'", link.path());
        match run_cancellable(
            cancel,
            self.base.client().point_read(&link, self.base.request_options()),
        )
        .await
        {
            Ok(document) => Ok(Some(document.to_entity()?)),
            // Only a missing document reads as empty; a missing collection
            // or database stays a fault.
            Err(RepositoryError::Store(fault)) if fault.is_document_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl<T> FetchMatching<T> for ReadRepository<T>
where
    T: DeserializeOwned + Send + Sync,
{
    async fn get_all(
        &self,
        filter: &Filter,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<T>> {
        debug!(
            "fetching first page of matches in '{}'",
            self.base.collection_link().path()
        );
        let query = StoreQuery::Filter(filter.clone());
        let page = self.run_query(&query, &PageOptions::default(), cancel).await?;
        Self::typed_items(page.items)
    }
}

#[async_trait]
impl<T> FetchPage<T> for ReadRepository<T>
where
    T: DeserializeOwned + Send + Sync,
{
    async fn query_page(
        &self,
        filter: &Filter,
        continuation: Option<&ContinuationToken>,
        take: Option<u32>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Page<T>> {
        debug!("query page in '{}'", self.base.collection_link().path());
        let query = StoreQuery::Filter(filter.clone());
        let page_options = PageOptions {
            max_items: take,
            skip: None,
            continuation: continuation.cloned(),
        };
        let raw = self.run_query(&query, &page_options, cancel).await?;
        Ok(Page {
            items: Self::typed_items(raw.items)?,
            continuation: raw.continuation,
        })
    }
}

#[async_trait]
impl<T> CountMatching for ReadRepository<T>
where
    T: DeserializeOwned + Send + Sync,
{
    async fn count_matching(
        &self,
        filter: &Filter,
        cancel: &CancellationToken,
    ) -> RepositoryResult<u64> {
        let query = StoreQuery::Filter(filter.clone());
        let page = self.run_query(&query, &PageOptions::default(), cancel).await?;
        Ok(page.items.len() as u64)
    }
}

#[async_trait]
impl<T> CountAll for ReadRepository<T>
where
    T: DeserializeOwned + Send + Sync,
{
    async fn count(&self, cancel: &CancellationToken) -> RepositoryResult<u64> {
        let query = StoreQuery::Aggregate(Aggregate::Count);
        let page = self.run_query(&query, &PageOptions::default(), cancel).await?;
        match page.items.first() {
            Some(scalar) => Ok(serde_json::from_value(scalar.clone())?),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl<T> DescribeCollection for ReadRepository<T>
where
    T: DeserializeOwned + Send + Sync,
{
    async fn collection_info(&self, cancel: &CancellationToken) -> RepositoryResult<CollectionInfo> {
        run_cancellable(
            cancel,
            self.base
                .client()
                .read_collection(self.base.collection_link(), self.base.request_options()),
        )
        .await
    }
}

impl<T> Queryable<T> for ReadRepository<T>
where
    T: DeserializeOwned + Send + Sync,
{
    fn query(&self) -> DocumentQuery<T> {
        DocumentQuery::new(
            self.base.client().clone(),
            self.base.collection_link().clone(),
            self.base.request_options().cloned(),
            StoreQuery::Filter(Filter::all()),
        )
    }

    fn query_raw(&self, sql: SqlQuery) -> DocumentQuery<T> {
        DocumentQuery::new(
            self.base.client().clone(),
            self.base.collection_link().clone(),
            self.base.request_options().cloned(),
            StoreQuery::Sql(sql),
        )
    }
}
