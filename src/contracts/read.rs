//! Read-side capability traits.
//!
//! Each trait carries exactly one operation, so consumers depend on the
//! smallest surface they need and test doubles stay tiny.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::filter::Filter;
use crate::query::{ContinuationToken, Page, SqlQuery};
use crate::repository::{DocumentQuery, RepositoryResult};
use crate::store::CollectionInfo;

/// Point read of a single item by key.
#[async_trait]
pub trait FetchByKey<K: ?Sized, T>: Send + Sync {
    /// Fetch one item by its key.
    ///
    /// # Returns
    /// * `Ok(Some(T))` - The item exists
    /// * `Ok(None)` - No item under that key; never an error
    /// * `Err(RepositoryError)` - Any other store fault
    async fn get(&self, id: &K, cancel: &CancellationToken) -> RepositoryResult<Option<T>>;
}

/// Fetch the items matching a predicate.
#[async_trait]
pub trait FetchMatching<T>: Send + Sync {
    /// Fetch matching items, bounded by one result page.
    ///
    /// Only the first page of matches is returned; callers that need the full
    /// result set should page explicitly via [`FetchPage::query_page`] or a
    /// query handle.
    async fn get_all(&self, filter: &Filter, cancel: &CancellationToken)
        -> RepositoryResult<Vec<T>>;
}

/// Explicit page-by-page retrieval.
#[async_trait]
pub trait FetchPage<T>: Send + Sync {
    /// Fetch one page of matching items.
    ///
    /// # Arguments
    /// * `filter` - Predicate to match
    /// * `continuation` - Cursor from the previous page, `None` for the first
    /// * `take` - Page-size cap, `None` for the store default
    ///
    /// # Returns
    /// A page whose continuation token is absent once the results are
    /// exhausted.
    async fn query_page(
        &self,
        filter: &Filter,
        continuation: Option<&ContinuationToken>,
        take: Option<u32>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Page<T>>;
}

/// Count the items matching a predicate.
#[async_trait]
pub trait CountMatching: Send + Sync {
    /// Count matching items within the first result page.
    ///
    /// Like [`FetchMatching::get_all`] this inspects a single page, so it may
    /// under-report when more matches exist than fit in one page. Use
    /// [`CountAll::count`] for an exact total.
    async fn count_matching(
        &self,
        filter: &Filter,
        cancel: &CancellationToken,
    ) -> RepositoryResult<u64>;
}

/// Exact collection count.
#[async_trait]
pub trait CountAll: Send + Sync {
    /// Exact number of items in the collection, computed server-side and
    /// independent of any page size.
    async fn count(&self, cancel: &CancellationToken) -> RepositoryResult<u64>;
}

/// Collection metadata access.
#[async_trait]
pub trait DescribeCollection: Send + Sync {
    /// Read the backing collection's metadata.
    async fn collection_info(&self, cancel: &CancellationToken) -> RepositoryResult<CollectionInfo>;
}

/// Lazy query handles.
///
/// Both methods are synchronous and perform no I/O; the returned handle
/// queries the store only when awaited.
pub trait Queryable<T>: Send + Sync {
    /// Start a query over the whole collection.
    fn query(&self) -> DocumentQuery<T>;

    /// Start a raw query with named parameters.
    fn query_raw(&self, sql: SqlQuery) -> DocumentQuery<T>;
}
