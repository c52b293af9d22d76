//! Lazy, composable query handles.

use std::marker::PhantomData;
use std::sync::Arc;

use async_stream::try_stream;
use futures::Stream;
use log::debug;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::error::{RepositoryError, RepositoryResult};
use super::run_cancellable;
use crate::filter::Filter;
use crate::query::{ContinuationToken, Page, PageOptions, StoreQuery};
use crate::store::{CollectionLink, DocumentStore, RequestOptions};

enum QueryState {
    Fresh,
    Continuing(ContinuationToken),
    Exhausted,
}

/// A lazily evaluated query over one collection.
///
/// Handles are produced by a repository's `query`/`query_raw` and hold their
/// own client reference, so they outlive the repository that created them.
/// No I/O happens until [`DocumentQuery::next_page`] is awaited or the
/// stream from [`DocumentQuery::into_stream`] is polled.
///
/// # Example
/// ```ignore
/// let mut open = repository.query().filter(field("done").eq(false)).take(20);
/// while let Some(page) = open.next_page(&cancel).await? {
///     for order in page.items { /* ... */ }
/// }
/// ```
pub struct DocumentQuery<T> {
    client: Arc<dyn DocumentStore>,
    link: CollectionLink,
    options: Option<RequestOptions>,
    query: StoreQuery,
    max_items: Option<u32>,
    skip: Option<u32>,
    state: QueryState,
    marker: PhantomData<fn() -> T>,
}

impl<T> DocumentQuery<T>
where
    T: DeserializeOwned + Send + Sync,
{
    pub(crate) fn new(
        client: Arc<dyn DocumentStore>,
        link: CollectionLink,
        options: Option<RequestOptions>,
        query: StoreQuery,
    ) -> Self {
        Self {
            client,
            link,
            options,
            query,
            max_items: None,
            skip: None,
            state: QueryState::Fresh,
            marker: PhantomData,
        }
    }

    /// Restrict the query to documents matching the filter. Replaces any
    /// previously configured query shape.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.query = StoreQuery::Filter(filter);
        self
    }

    /// Cap the page size; the store default applies otherwise.
    pub fn take(mut self, max_items: u32) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Skip leading matches before the first page. Ignored once paging has
    /// produced a continuation token.
    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Resume from a continuation token of an earlier, identically shaped
    /// query.
    pub fn continue_from(mut self, token: ContinuationToken) -> Self {
        self.state = QueryState::Continuing(token);
        self
    }

    /// Fetch the next page of results.
    ///
    /// # Returns
    /// * `Ok(Some(Page))` - The next page; its token mirrors the new position
    /// * `Ok(None)` - The query is exhausted; no store call was issued
    pub async fn next_page(
        &mut self,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Option<Page<T>>> {
        let page_options = match &self.state {
            QueryState::Exhausted => return Ok(None),
            QueryState::Fresh => PageOptions {
                max_items: self.max_items,
                skip: self.skip,
                continuation: None,
            },
            QueryState::Continuing(token) => PageOptions {
                max_items: self.max_items,
                skip: None,
                continuation: Some(token.clone()),
            },
        };

        debug!("query page against '{}'", self.link.path());
        let raw = run_cancellable(
            cancel,
            self.client
                .query(&self.link, &self.query, &page_options, self.options.as_ref()),
        )
        .await?;

        self.state = match &raw.continuation {
            Some(token) => QueryState::Continuing(token.clone()),
            None => QueryState::Exhausted,
        };

        let items = raw
            .items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<T>>>()?;

        Ok(Some(Page {
            items,
            continuation: raw.continuation,
        }))
    }

    /// Drain the remaining pages as a stream of items.
    ///
    /// Pages are still fetched one at a time; the stream simply flattens
    /// them. Errors end the stream after being yielded.
    pub fn into_stream(self, cancel: CancellationToken) -> impl Stream<Item = RepositoryResult<T>> {
        try_stream! {
            let mut query = self;
            while let Some(page) = query.next_page(&cancel).await? {
                for item in page.items {
                    yield item;
                }
            }
        }
    }
}
