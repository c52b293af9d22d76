//! In-memory store client implementation.
//!
//! This module provides an in-process implementation of the full
//! [`DocumentStore`] trait, suitable for unit testing and local development.
//! Documents live in insertion order inside plain maps, so execution is fast,
//! deterministic and isolated.
//!
//! Beyond the trait itself the store carries test instrumentation: a call log
//! of every issued operation, injectable provisioning faults, an artificial
//! latency knob for cancellation tests, and a configurable default page size.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::document::{Document, FIELD_ETAG, FIELD_ID, FIELD_TIMESTAMP};
use crate::filter::{CompareOp, Filter};
use crate::query::{Aggregate, ContinuationToken, PageOptions, SqlParameter, SqlQuery, StoreQuery};
use crate::store::{
    CollectionInfo, CollectionLink, CollectionSettings, DocumentLink, DocumentStore, ProcedureLink,
    QueryPage, RequestOptions, StoreError, StoreResult,
};

const DEFAULT_PAGE_SIZE: u32 = 100;

/// One entry in the call log, recorded at operation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CreateDatabase,
    CreateCollection,
    ReadCollection,
    ReplaceCollection,
    PointRead,
    Create,
    Replace,
    Upsert,
    Delete,
    DeleteCollection,
    Query,
    ExecuteProcedure,
}

type ProcedureFn = dyn Fn(&[Value]) -> StoreResult<Value> + Send + Sync;

/// In-memory document store.
///
/// Cloning is cheap and clones share the same data, call log and knobs.
///
/// # Example
/// ```
/// use docstore::store::InMemoryStore;
///
/// let store = InMemoryStore::with_page_size(10);
/// assert_eq!(store.total_ops(), 0);
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    data: RwLock<StoreData>,
    procedures: RwLock<HashMap<String, Arc<ProcedureFn>>>,

    // Test instrumentation
    ops: Mutex<Vec<StoreOp>>,
    latency: RwLock<Option<Duration>>,
    database_create_fault: RwLock<Option<StoreError>>,
    collection_create_fault: RwLock<Option<StoreError>>,

    default_page_size: u32,
}

#[derive(Default)]
struct StoreData {
    databases: HashMap<String, DatabaseData>,
}

#[derive(Default)]
struct DatabaseData {
    collections: HashMap<String, CollectionData>,
}

struct CollectionData {
    settings: CollectionSettings,
    // Insertion order is the natural result order for queries.
    documents: Vec<Document>,
}

impl InMemoryStore {
    /// Create an empty store with the default page size.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty store with a specific default page size, used when a
    /// query does not cap its page explicitly.
    pub fn with_page_size(default_page_size: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(StoreData::default()),
                procedures: RwLock::new(HashMap::new()),
                ops: Mutex::new(Vec::new()),
                latency: RwLock::new(None),
                database_create_fault: RwLock::new(None),
                collection_create_fault: RwLock::new(None),
                default_page_size,
            }),
        }
    }

    /// Register a native closure as a stored procedure.
    pub fn register_procedure<F>(&self, link: &ProcedureLink, procedure: F)
    where
        F: Fn(&[Value]) -> StoreResult<Value> + Send + Sync + 'static,
    {
        self.inner
            .procedures
            .write()
            .insert(link.path(), Arc::new(procedure));
    }

    // ==================== Test Knobs ====================

    /// Inject a fault returned by the next database creations, or clear it.
    pub fn set_database_create_fault(&self, fault: Option<StoreError>) {
        *self.inner.database_create_fault.write() = fault;
    }

    /// Inject a fault returned by the next collection creations, or clear it.
    pub fn set_collection_create_fault(&self, fault: Option<StoreError>) {
        *self.inner.collection_create_fault.write() = fault;
    }

    /// Add artificial latency to every operation, for cancellation tests.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.inner.latency.write() = latency;
    }

    /// Snapshot of the call log, in issue order.
    pub fn ops(&self) -> Vec<StoreOp> {
        self.inner.ops.lock().clone()
    }

    /// How many times a specific operation was issued.
    pub fn op_count(&self, op: StoreOp) -> usize {
        self.inner.ops.lock().iter().filter(|o| **o == op).count()
    }

    /// Total number of issued operations.
    pub fn total_ops(&self) -> usize {
        self.inner.ops.lock().len()
    }

    /// Reset the call log.
    pub fn clear_ops(&self) {
        self.inner.ops.lock().clear();
    }

    /// Number of documents in a collection, zero when it does not exist.
    pub fn document_count(&self, link: &CollectionLink) -> usize {
        let data = self.inner.data.read();
        data.databases
            .get(&link.database_id)
            .and_then(|db| db.collections.get(&link.collection_id))
            .map(|collection| collection.documents.len())
            .unwrap_or(0)
    }

    // ==================== Internals ====================

    /// Record the operation and apply artificial latency.
    async fn observe(&self, op: StoreOp) {
        self.inner.ops.lock().push(op);
        let latency = *self.inner.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn stamp(document: &mut Document, id: &str) {
        document.set(FIELD_ID, json!(id));
        document.set(FIELD_ETAG, json!(Uuid::new_v4().to_string()));
        document.set(FIELD_TIMESTAMP, json!(Utc::now().timestamp()));
    }

    /// Pull the document id out of a body, or mint a fresh one.
    fn effective_id(document: &Document) -> StoreResult<String> {
        match document.as_value().get(FIELD_ID) {
            None | Some(Value::Null) => Ok(Uuid::new_v4().to_string()),
            Some(Value::String(id)) => Ok(id.clone()),
            Some(_) => Err(StoreError::BadRequest(
                "document id must be a string".to_string(),
            )),
        }
    }

    fn run_rows(
        &self,
        collection: &CollectionData,
        filter: &Filter,
        page: &PageOptions,
        options: Option<&RequestOptions>,
    ) -> StoreResult<QueryPage> {
        let page_size = page
            .max_items
            .or(options.and_then(|o| o.max_item_count))
            .unwrap_or(self.inner.default_page_size);
        if page_size == 0 {
            return Err(StoreError::BadRequest(
                "page size must be positive".to_string(),
            ));
        }
        let page_size = page_size as usize;

        // The token already encodes the position, so skip only seeds the
        // first page.
        let offset = match &page.continuation {
            Some(token) => token.as_str().parse::<usize>().map_err(|_| {
                StoreError::BadRequest("malformed continuation token".to_string())
            })?,
            None => page.skip.unwrap_or(0) as usize,
        };

        let matches: Vec<&Document> = collection
            .documents
            .iter()
            .filter(|document| filter.matches(document))
            .collect();

        let start = offset.min(matches.len());
        let end = (offset + page_size).min(matches.len());
        let items: Vec<Value> = matches[start..end]
            .iter()
            .map(|document| document.as_value().clone())
            .collect();

        // A full page always yields a token, even when it happens to be the
        // last one; the drain then ends on an empty page without a token.
        let continuation = (end - start == page_size)
            .then(|| ContinuationToken::new(end.to_string()));

        Ok(QueryPage {
            items,
            continuation,
        })
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Collection Resolution ====================

impl StoreData {
    fn collection(&self, link: &CollectionLink) -> StoreResult<&CollectionData> {
        let database = self
            .databases
            .get(&link.database_id)
            .ok_or_else(|| StoreError::database_not_found(format!("dbs/{}", link.database_id)))?;
        database
            .collections
            .get(&link.collection_id)
            .ok_or_else(|| StoreError::collection_not_found(link.path()))
    }

    fn collection_mut(&mut self, link: &CollectionLink) -> StoreResult<&mut CollectionData> {
        let database = self
            .databases
            .get_mut(&link.database_id)
            .ok_or_else(|| StoreError::database_not_found(format!("dbs/{}", link.database_id)))?;
        database
            .collections
            .get_mut(&link.collection_id)
            .ok_or_else(|| StoreError::collection_not_found(link.path()))
    }
}

impl CollectionData {
    fn info(&self, link: &CollectionLink) -> CollectionInfo {
        CollectionInfo {
            database_id: link.database_id.clone(),
            collection_id: link.collection_id.clone(),
            settings: self.settings.clone(),
            document_count: self.documents.len() as u64,
        }
    }

    fn position(&self, document_id: &str) -> Option<usize> {
        self.documents
            .iter()
            .position(|document| document.id() == Some(document_id))
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create_database_if_absent(
        &self,
        database_id: &str,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<()> {
        self.observe(StoreOp::CreateDatabase).await;
        if let Some(fault) = self.inner.database_create_fault.read().clone() {
            return Err(fault);
        }
        self.inner
            .data
            .write()
            .databases
            .entry(database_id.to_string())
            .or_default();
        Ok(())
    }

    async fn create_collection_if_absent(
        &self,
        link: &CollectionLink,
        settings: Option<&CollectionSettings>,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<CollectionInfo> {
        self.observe(StoreOp::CreateCollection).await;
        if let Some(fault) = self.inner.collection_create_fault.read().clone() {
            return Err(fault);
        }
        let mut data = self.inner.data.write();
        let database = data
            .databases
            .get_mut(&link.database_id)
            .ok_or_else(|| StoreError::database_not_found(format!("dbs/{}", link.database_id)))?;
        let collection = database
            .collections
            .entry(link.collection_id.clone())
            .or_insert_with(|| CollectionData {
                settings: settings.cloned().unwrap_or_default(),
                documents: Vec::new(),
            });
        Ok(collection.info(link))
    }

    async fn read_collection(
        &self,
        link: &CollectionLink,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<CollectionInfo> {
        self.observe(StoreOp::ReadCollection).await;
        let data = self.inner.data.read();
        Ok(data.collection(link)?.info(link))
    }

    async fn replace_collection(
        &self,
        link: &CollectionLink,
        settings: &CollectionSettings,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<CollectionInfo> {
        self.observe(StoreOp::ReplaceCollection).await;
        let mut data = self.inner.data.write();
        let collection = data.collection_mut(link)?;
        collection.settings = settings.clone();
        Ok(collection.info(link))
    }

    async fn point_read(
        &self,
        link: &DocumentLink,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<Document> {
        self.observe(StoreOp::PointRead).await;
        let data = self.inner.data.read();
        let collection = data.collection(&link.collection)?;
        collection
            .position(&link.document_id)
            .map(|index| collection.documents[index].clone())
            .ok_or_else(|| StoreError::document_not_found(link.path()))
    }

    async fn create(
        &self,
        link: &CollectionLink,
        mut document: Document,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<Document> {
        self.observe(StoreOp::Create).await;
        let id = Self::effective_id(&document)?;
        let mut data = self.inner.data.write();
        let collection = data.collection_mut(link)?;
        if collection.position(&id).is_some() {
            return Err(StoreError::Conflict(format!(
                "document '{}' already exists in {}",
                id,
                link.path()
            )));
        }
        Self::stamp(&mut document, &id);
        collection.documents.push(document.clone());
        Ok(document)
    }

    async fn replace(
        &self,
        link: &DocumentLink,
        mut document: Document,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<Document> {
        self.observe(StoreOp::Replace).await;
        let mut data = self.inner.data.write();
        let collection = data.collection_mut(&link.collection)?;
        let index = collection
            .position(&link.document_id)
            .ok_or_else(|| StoreError::document_not_found(link.path()))?;
        Self::stamp(&mut document, &link.document_id);
        collection.documents[index] = document.clone();
        Ok(document)
    }

    async fn upsert(
        &self,
        link: &DocumentLink,
        mut document: Document,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<Document> {
        self.observe(StoreOp::Upsert).await;
        let mut data = self.inner.data.write();
        let collection = data.collection_mut(&link.collection)?;
        Self::stamp(&mut document, &link.document_id);
        match collection.position(&link.document_id) {
            Some(index) => collection.documents[index] = document.clone(),
            None => collection.documents.push(document.clone()),
        }
        Ok(document)
    }

    async fn delete(
        &self,
        link: &DocumentLink,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<()> {
        self.observe(StoreOp::Delete).await;
        let mut data = self.inner.data.write();
        let collection = data.collection_mut(&link.collection)?;
        let index = collection
            .position(&link.document_id)
            .ok_or_else(|| StoreError::document_not_found(link.path()))?;
        collection.documents.remove(index);
        Ok(())
    }

    async fn delete_collection(
        &self,
        link: &CollectionLink,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<()> {
        self.observe(StoreOp::DeleteCollection).await;
        let mut data = self.inner.data.write();
        let database = data
            .databases
            .get_mut(&link.database_id)
            .ok_or_else(|| StoreError::database_not_found(format!("dbs/{}", link.database_id)))?;
        database
            .collections
            .remove(&link.collection_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::collection_not_found(link.path()))
    }

    async fn query(
        &self,
        link: &CollectionLink,
        query: &StoreQuery,
        page: &PageOptions,
        options: Option<&RequestOptions>,
    ) -> StoreResult<QueryPage> {
        self.observe(StoreOp::Query).await;
        let data = self.inner.data.read();
        let collection = data.collection(link)?;
        match query {
            StoreQuery::Filter(filter) => self.run_rows(collection, filter, page, options),
            StoreQuery::Sql(sql) => match parse_sql(sql)? {
                ParsedSql::Rows(filter) => self.run_rows(collection, &filter, page, options),
                ParsedSql::CountAll => Ok(count_page(collection)),
            },
            StoreQuery::Aggregate(Aggregate::Count) => Ok(count_page(collection)),
        }
    }

    async fn execute_stored_procedure(
        &self,
        link: &ProcedureLink,
        parameters: Vec<Value>,
        _options: Option<&RequestOptions>,
    ) -> StoreResult<Value> {
        self.observe(StoreOp::ExecuteProcedure).await;
        {
            let data = self.inner.data.read();
            data.collection(&link.collection)?;
        }
        let procedure = self
            .inner
            .procedures
            .read()
            .get(&link.path())
            .cloned()
            .ok_or_else(|| StoreError::procedure_not_found(link.path()))?;
        procedure(&parameters)
    }
}

fn count_page(collection: &CollectionData) -> QueryPage {
    QueryPage {
        items: vec![json!(collection.documents.len() as u64)],
        continuation: None,
    }
}

// ==================== SQL Subset ====================
//
// The store understands just enough of the SQL dialect to back tests and
// samples:
//
//   SELECT * FROM c
//   SELECT * FROM c WHERE c.<path> <op> <value> [AND ...]
//   SELECT VALUE COUNT(1) FROM c
//
// Values are @parameters, 'single quoted strings' (no escaping), numbers,
// true, false or null. Operators: =, !=, <>, <, <=, >, >=.

enum ParsedSql {
    Rows(Filter),
    CountAll,
}

fn parse_sql(query: &SqlQuery) -> StoreResult<ParsedSql> {
    let text = query.text.trim();

    if let Some(rest) = strip_keywords(text, &["select", "value", "count"]) {
        let rest = rest.trim_start();
        let rest = rest
            .strip_prefix("(1)")
            .or_else(|| rest.strip_prefix("(*)"))
            .ok_or_else(|| unsupported(text))?;
        let rest = strip_keywords(rest, &["from", "c"]).ok_or_else(|| unsupported(text))?;
        if !rest.trim().is_empty() {
            return Err(unsupported(text));
        }
        return Ok(ParsedSql::CountAll);
    }

    let rest = strip_keywords(text, &["select", "*", "from", "c"]).ok_or_else(|| unsupported(text))?;
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok(ParsedSql::Rows(Filter::All));
    }

    let clause = strip_keywords(rest, &["where"]).ok_or_else(|| unsupported(text))?;
    let mut filter: Option<Filter> = None;
    for part in split_outside_quotes(clause, " and ") {
        let condition = parse_condition(&part, &query.parameters)?;
        filter = Some(match filter {
            Some(built) => built.and(condition),
            None => condition,
        });
    }
    // The split always yields at least one part.
    Ok(ParsedSql::Rows(filter.unwrap_or(Filter::All)))
}

fn unsupported(text: &str) -> StoreError {
    StoreError::BadRequest(format!("unsupported query: {text}"))
}

/// Strip a sequence of case-insensitive keywords, each preceded by optional
/// whitespace. Returns the remaining text.
fn strip_keywords<'a>(text: &'a str, keywords: &[&str]) -> Option<&'a str> {
    let mut rest = text;
    for keyword in keywords {
        rest = rest.trim_start();
        if rest.len() < keyword.len() || !rest.is_char_boundary(keyword.len()) {
            return None;
        }
        let (head, tail) = rest.split_at(keyword.len());
        if !head.eq_ignore_ascii_case(keyword) {
            return None;
        }
        rest = tail;
    }
    Some(rest)
}

/// Split on a case-insensitive separator, ignoring matches inside single
/// quotes.
fn split_outside_quotes(text: &str, separator: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let sep = separator.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            in_quote = !in_quote;
            i += 1;
            continue;
        }
        if !in_quote && i + sep.len() <= bytes.len() && bytes[i..i + sep.len()].eq_ignore_ascii_case(sep)
        {
            parts.push(text[start..i].to_string());
            i += sep.len();
            start = i;
            continue;
        }
        i += 1;
    }
    parts.push(text[start..].to_string());
    parts
}

fn parse_condition(condition: &str, parameters: &[SqlParameter]) -> StoreResult<Filter> {
    let (lhs, op, rhs) = split_comparison(condition)?;
    let path = lhs
        .trim()
        .strip_prefix("c.")
        .ok_or_else(|| StoreError::BadRequest(format!("expected c.<field> path in '{condition}'")))?;
    if path.is_empty() {
        return Err(StoreError::BadRequest(format!(
            "expected c.<field> path in '{condition}'"
        )));
    }
    let value = parse_value(rhs.trim(), parameters)?;
    Ok(Filter::Compare {
        path: path.to_string(),
        op,
        value,
    })
}

fn split_comparison(condition: &str) -> StoreResult<(&str, CompareOp, &str)> {
    let bytes = condition.as_bytes();
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            in_quote = !in_quote;
            i += 1;
            continue;
        }
        if !in_quote {
            // Two-byte operators take precedence over their one-byte prefixes.
            if i + 2 <= bytes.len() {
                let op = match &bytes[i..i + 2] {
                    b"!=" => Some(CompareOp::Ne),
                    b"<>" => Some(CompareOp::Ne),
                    b"<=" => Some(CompareOp::Le),
                    b">=" => Some(CompareOp::Ge),
                    _ => None,
                };
                if let Some(op) = op {
                    return Ok((&condition[..i], op, &condition[i + 2..]));
                }
            }
            let op = match bytes[i] {
                b'=' => Some(CompareOp::Eq),
                b'<' => Some(CompareOp::Lt),
                b'>' => Some(CompareOp::Gt),
                _ => None,
            };
            if let Some(op) = op {
                return Ok((&condition[..i], op, &condition[i + 1..]));
            }
        }
        i += 1;
    }
    Err(StoreError::BadRequest(format!(
        "no comparison operator in '{condition}'"
    )))
}

fn parse_value(token: &str, parameters: &[SqlParameter]) -> StoreResult<Value> {
    if token.starts_with('@') {
        return parameters
            .iter()
            .find(|parameter| parameter.name == token)
            .map(|parameter| parameter.value.clone())
            .ok_or_else(|| StoreError::BadRequest(format!("unbound parameter {token}")));
    }
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        return Ok(json!(token[1..token.len() - 1]));
    }
    if token.eq_ignore_ascii_case("true") {
        return Ok(json!(true));
    }
    if token.eq_ignore_ascii_case("false") {
        return Ok(json!(false));
    }
    if token.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    if let Ok(integer) = token.parse::<i64>() {
        return Ok(json!(integer));
    }
    if let Ok(float) = token.parse::<f64>() {
        return Ok(json!(float));
    }
    Err(StoreError::BadRequest(format!("unsupported literal '{token}'")))
}
