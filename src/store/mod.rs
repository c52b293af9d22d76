//! Store client abstraction.
//!
//! The repository layer never talks to a document store directly; it goes
//! through the [`DocumentStore`] trait, injected at construction. Transport,
//! retries, throttling and authentication are the client's concern and are
//! consumed as-is. The bundled [`InMemoryStore`] implements the full trait
//! in-process for tests and local development.
//!
//! # Trait Composition
//!
//! A production backend implements [`DocumentStore`] once and every
//! repository type works with it:
//!
//! ```ignore
//! let store: Arc<dyn DocumentStore> = Arc::new(MyCosmosClient::connect(settings)?);
//! let orders = CrudRepository::<Order>::new("shop", "orders", store, None);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::query::{ContinuationToken, PageOptions, StoreQuery};

pub mod error;
pub mod memory;

pub use error::{ResourceKind, StoreError, StoreResult};
pub use memory::{InMemoryStore, StoreOp};

// ==================== Resource Addresses ====================

/// Address of a collection inside a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionLink {
    pub database_id: String,
    pub collection_id: String,
}

impl CollectionLink {
    pub fn new(database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            collection_id: collection_id.into(),
        }
    }

    /// Address of a document inside this collection.
    pub fn document(&self, document_id: impl Into<String>) -> DocumentLink {
        DocumentLink {
            collection: self.clone(),
            document_id: document_id.into(),
        }
    }

    /// Address of a stored procedure inside this collection.
    pub fn procedure(&self, procedure_id: impl Into<String>) -> ProcedureLink {
        ProcedureLink {
            collection: self.clone(),
            procedure_id: procedure_id.into(),
        }
    }

    /// Canonical path, used in logs and fault messages.
    pub fn path(&self) -> String {
        format!("dbs/{}/colls/{}", self.database_id, self.collection_id)
    }
}

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentLink {
    pub collection: CollectionLink,
    pub document_id: String,
}

impl DocumentLink {
    pub fn path(&self) -> String {
        format!("{}/docs/{}", self.collection.path(), self.document_id)
    }
}

/// Address of a stored procedure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcedureLink {
    pub collection: CollectionLink,
    pub procedure_id: String,
}

impl ProcedureLink {
    pub fn path(&self) -> String {
        format!("{}/sprocs/{}", self.collection.path(), self.procedure_id)
    }
}

// ==================== Request Shapes ====================

/// Per-request tuning passed through to the store client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Page-size cap for reads and queries.
    pub max_item_count: Option<u32>,
    /// Partition key routing hint.
    pub partition_key: Option<String>,
    /// Provisioned throughput hint for resource creation.
    pub throughput: Option<u32>,
}

/// Collection-level settings, supplied at creation or replacement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSettings {
    pub partition_key_path: Option<String>,
    pub default_ttl_seconds: Option<i64>,
}

/// Metadata of an existing collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub database_id: String,
    pub collection_id: String,
    pub settings: CollectionSettings,
    pub document_count: u64,
}

/// One raw page of query results.
///
/// Items are plain JSON values rather than [`Document`]s because aggregate
/// queries return bare scalars.
#[derive(Debug, Clone)]
pub struct QueryPage {
    pub items: Vec<Value>,
    pub continuation: Option<ContinuationToken>,
}

// ==================== Client Contract ====================

/// Capabilities required of an injected store client.
///
/// All operations are single round-trips. Cancellation is driven by the
/// repository layer dropping the returned future, so implementations must be
/// safe to abandon at any await point.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one client instance is shared by
/// every repository built over it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a database if it does not exist. Converges on the existing
    /// database otherwise.
    async fn create_database_if_absent(
        &self,
        database_id: &str,
        options: Option<&RequestOptions>,
    ) -> StoreResult<()>;

    /// Create a collection if it does not exist. Converges on the existing
    /// collection otherwise.
    async fn create_collection_if_absent(
        &self,
        link: &CollectionLink,
        settings: Option<&CollectionSettings>,
        options: Option<&RequestOptions>,
    ) -> StoreResult<CollectionInfo>;

    /// Read collection metadata.
    async fn read_collection(
        &self,
        link: &CollectionLink,
        options: Option<&RequestOptions>,
    ) -> StoreResult<CollectionInfo>;

    /// Replace collection-level settings.
    async fn replace_collection(
        &self,
        link: &CollectionLink,
        settings: &CollectionSettings,
        options: Option<&RequestOptions>,
    ) -> StoreResult<CollectionInfo>;

    /// Read a single document by address.
    ///
    /// # Returns
    /// * `Ok(Document)` - The stored document
    /// * `Err(StoreError::NotFound)` - With the precise missing resource kind
    async fn point_read(
        &self,
        link: &DocumentLink,
        options: Option<&RequestOptions>,
    ) -> StoreResult<Document>;

    /// Insert a new document. The store assigns `id`, `_etag` and `_ts` when
    /// absent and returns the stored form.
    async fn create(
        &self,
        link: &CollectionLink,
        document: Document,
        options: Option<&RequestOptions>,
    ) -> StoreResult<Document>;

    /// Replace the document at the given address. The address wins over any
    /// `id` embedded in the body.
    async fn replace(
        &self,
        link: &DocumentLink,
        document: Document,
        options: Option<&RequestOptions>,
    ) -> StoreResult<Document>;

    /// Create or replace the document at the given address.
    async fn upsert(
        &self,
        link: &DocumentLink,
        document: Document,
        options: Option<&RequestOptions>,
    ) -> StoreResult<Document>;

    /// Delete a single document.
    async fn delete(
        &self,
        link: &DocumentLink,
        options: Option<&RequestOptions>,
    ) -> StoreResult<()>;

    /// Delete a whole collection and everything in it.
    async fn delete_collection(
        &self,
        link: &CollectionLink,
        options: Option<&RequestOptions>,
    ) -> StoreResult<()>;

    /// Execute a query and return one page of results.
    async fn query(
        &self,
        link: &CollectionLink,
        query: &StoreQuery,
        page: &PageOptions,
        options: Option<&RequestOptions>,
    ) -> StoreResult<QueryPage>;

    /// Execute a server-side stored procedure.
    async fn execute_stored_procedure(
        &self,
        link: &ProcedureLink,
        parameters: Vec<Value>,
        options: Option<&RequestOptions>,
    ) -> StoreResult<Value>;
}
