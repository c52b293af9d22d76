//! Generic async repository layer over a partitioned document store.
//!
//! This crate lets application code perform CRUD and query operations against
//! a logical database/collection pair without depending on any concrete store
//! client API. The store client is an injected collaborator behind the
//! [`store::DocumentStore`] trait; the crate ships [`store::InMemoryStore`]
//! for tests and local development, real backends are provided by consumers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Application code (entities, services)                   │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Capability contracts (contracts) - composed traits      │
//! │  ReadRepositoryContract / CrudRepositoryContract         │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Repositories (repository) - provisioning + operations   │
//! │  ReadRepository<T> / CrudRepository<T> / DocumentQuery   │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  DocumentStore trait (store) - injected client           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docstore::contracts::*;
//! use docstore::{CancellationToken, CrudRepository, InMemoryStore};
//!
//! let store = Arc::new(InMemoryStore::new());
//! let orders = CrudRepository::<Order>::new("shop", "orders", store, None);
//! let cancel = CancellationToken::new();
//!
//! orders.ready(&cancel).await?;
//! let created = orders.add(&order, &cancel).await?;
//! ```
//!
//! Repositories are lazy: the constructor performs no I/O, and the backing
//! database and collection are created on the first [`repository::RepositoryBase::ready`]
//! call. Every operation takes a cancellation token and is a single
//! stateless round-trip to the store.

pub mod contracts;
pub mod document;
pub mod filter;
pub mod query;
pub mod repository;
pub mod settings;
pub mod store;

pub use document::Document;
pub use filter::{field, Filter};
pub use query::{Aggregate, ContinuationToken, Page, PageOptions, SqlParameter, SqlQuery, StoreQuery};
pub use repository::{
    CrudRepository, DocumentQuery, Entity, ProvisioningState, ReadRepository, RepositoryBase,
    RepositoryError, RepositoryResult,
};
pub use settings::StoreSettings;
pub use store::{
    CollectionInfo, CollectionLink, CollectionSettings, DocumentLink, DocumentStore, InMemoryStore,
    ProcedureLink, QueryPage, RequestOptions, ResourceKind, StoreError, StoreResult,
};

// Cancellation is part of every operation signature, so the token type is
// re-exported for downstream convenience.
pub use tokio_util::sync::CancellationToken;
