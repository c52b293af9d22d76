//! Capability contracts for repository implementations.
//!
//! This module provides a collection of focused, single-operation traits
//! that abstract document access. By splitting responsibilities across
//! minimal traits, consumers depend only on the capabilities they use and
//! implementations stay focused and testable.
//!
//! # Module Organization
//!
//! - [`read`]: fetch, page, count and describe operations
//! - [`write`]: add, update, upsert, delete and procedure operations
//!
//! # Trait Composition
//!
//! Services usually want a bundle rather than a dozen bounds. The composed
//! contracts cover the two common shapes:
//!
//! ```ignore
//! async fn report<R: ReadRepositoryContract<Order>>(repo: &R) -> RepositoryResult<u64> {
//!     repo.count(&cancel).await
//! }
//!
//! let orders: Arc<dyn CrudRepositoryContract<Order>> = Arc::new(repository);
//! ```

pub mod read;
pub mod write;

pub use read::{
    CountAll, CountMatching, DescribeCollection, FetchByKey, FetchMatching, FetchPage, Queryable,
};
pub use write::{
    AddItem, DeleteCollection, DeleteItem, ExecuteProcedure, ReplaceCollection, UpdateEntity,
    UpdateItem, UpsertItem,
};

/// Composite contract for read-only repositories.
///
/// Automatically implemented for any type carrying all read capabilities
/// keyed by string ids.
pub trait ReadRepositoryContract<T>:
    FetchByKey<str, T>
    + FetchMatching<T>
    + FetchPage<T>
    + CountMatching
    + CountAll
    + DescribeCollection
    + Queryable<T>
{
}

impl<T, R> ReadRepositoryContract<T> for R where
    R: FetchByKey<str, T>
        + FetchMatching<T>
        + FetchPage<T>
        + CountMatching
        + CountAll
        + DescribeCollection
        + Queryable<T>
{
}

/// Composite contract for read-write repositories.
///
/// Automatically implemented for any type carrying the read contract plus
/// all write capabilities.
pub trait CrudRepositoryContract<T>:
    ReadRepositoryContract<T>
    + AddItem<T>
    + UpdateItem<str, T>
    + UpdateEntity<T>
    + UpsertItem<str, T>
    + DeleteItem<str>
    + DeleteCollection
    + ReplaceCollection
    + ExecuteProcedure<T>
{
}

impl<T, R> CrudRepositoryContract<T> for R where
    R: ReadRepositoryContract<T>
        + AddItem<T>
        + UpdateItem<str, T>
        + UpdateEntity<T>
        + UpsertItem<str, T>
        + DeleteItem<str>
        + DeleteCollection
        + ReplaceCollection
        + ExecuteProcedure<T>
{
}
