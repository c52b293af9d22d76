//! Schemaless document model.
//!
//! A [`Document`] is the unit of storage: a JSON object enriched by the store
//! with system fields (`id`, `_etag`, `_ts`). Application entities convert to
//! and from documents via serde, so repositories never constrain entity
//! shapes beyond "serializes to a JSON object".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document identifier field, assigned by the store when absent.
pub const FIELD_ID: &str = "id";
/// Entity tag field, replaced by the store on every write.
pub const FIELD_ETAG: &str = "_etag";
/// Last-write epoch-seconds field, replaced by the store on every write.
pub const FIELD_TIMESTAMP: &str = "_ts";

/// A schemaless JSON document with store-maintained system fields.
///
/// The wrapped value is always a JSON object; [`Document::from_entity`]
/// rejects entities that serialize to anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    body: Value,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            body: Value::Object(serde_json::Map::new()),
        }
    }

    /// Build a document from an application entity.
    ///
    /// # Returns
    /// * `Ok(Document)` - The serialized entity
    /// * `Err` - If serialization fails or the entity is not a JSON object
    pub fn from_entity<T: Serialize>(entity: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_value(entity)?;
        if !body.is_object() {
            return Err(serde::ser::Error::custom(
                "entity must serialize to a JSON object",
            ));
        }
        Ok(Self { body })
    }

    /// Deserialize the document into an application entity.
    pub fn to_entity<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }

    /// The store-assigned document identifier, if present.
    pub fn id(&self) -> Option<&str> {
        self.body.get(FIELD_ID).and_then(Value::as_str)
    }

    /// The entity tag of the last write, if present.
    pub fn etag(&self) -> Option<&str> {
        self.body.get(FIELD_ETAG).and_then(Value::as_str)
    }

    /// Epoch seconds of the last write, if present.
    pub fn timestamp(&self) -> Option<i64> {
        self.body.get(FIELD_TIMESTAMP).and_then(Value::as_i64)
    }

    /// Look up a field by dotted path, e.g. `"customer.city"`.
    ///
    /// Traverses nested objects only; a missing segment yields `None`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.body;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Set a top-level field, replacing any previous value.
    pub fn set(&mut self, field: &str, value: Value) {
        if let Value::Object(map) = &mut self.body {
            map.insert(field.to_string(), value);
        }
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.body
    }

    /// Consume the document, yielding the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.body
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
