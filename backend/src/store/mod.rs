//! Document store abstraction.
//!
//! Records live in named collections as schemaless JSON objects addressed by
//! key. The gateway holds no state of its own; every handler reads and writes
//! through this trait.

mod sqlite;

pub use sqlite::SqliteStore;
pub(crate) use sqlite::open_connection;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A stored record.
pub type Document = Map<String, Value>;

const KEY_LEN: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No document to update: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Malformed document: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Handle to a single record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    pub collection: String,
    pub id: String,
}

impl DocRef {
    pub fn new(collection: &str, id: &str) -> Self {
        Self {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for DocRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A record returned by a query, together with its handle.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub reference: DocRef,
    pub data: Document,
}

impl Snapshot {
    pub fn id(&self) -> &str {
        &self.reference.id
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a record, `None` when absent.
    async fn get(&self, doc: &DocRef) -> Result<Option<Document>>;

    /// All records of `collection` whose top-level `field` equals `value`.
    async fn query_eq(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Snapshot>>;

    /// Create or replace a whole record.
    async fn set(&self, doc: &DocRef, data: Document) -> Result<()>;

    /// Overwrite the given top-level fields of an existing record.
    async fn update(&self, doc: &DocRef, fields: Document) -> Result<()>;

    /// Append each element not already present in the array `field`.
    async fn array_union(&self, doc: &DocRef, field: &str, elements: Vec<Value>) -> Result<()>;

    /// Remove every element of the array `field` equal to one of `elements`.
    async fn array_remove(&self, doc: &DocRef, field: &str, elements: Vec<Value>) -> Result<()>;

    /// Handle for a new record with a generated key.
    fn new_ref(&self, collection: &str) -> DocRef {
        DocRef {
            collection: collection.to_string(),
            id: generate_key(),
        }
    }
}

/// Random alphanumeric record key.
pub fn generate_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LEN)
        .map(char::from)
        .collect()
}

/// Serialize a typed record into a document.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Malformed(format!("expected an object, got {}", other))),
        Err(e) => Err(StoreError::Malformed(e.to_string())),
    }
}

/// Deserialize a document into a typed record.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::Malformed(e.to_string()))
}

/// Apply a union of `elements` to the array stored under `field`.
pub(crate) fn union_into(doc: &mut Document, field: &str, elements: Vec<Value>) -> Result<()> {
    let array = array_field(doc, field)?;
    for element in elements {
        if !array.contains(&element) {
            array.push(element);
        }
    }
    Ok(())
}

/// Drop from the array under `field` every element equal to one of `elements`.
pub(crate) fn remove_from(doc: &mut Document, field: &str, elements: &[Value]) -> Result<()> {
    let array = array_field(doc, field)?;
    array.retain(|existing| !elements.contains(existing));
    Ok(())
}

// A missing or non-array field is treated as an empty array.
fn array_field<'a>(doc: &'a mut Document, field: &str) -> Result<&'a mut Vec<Value>> {
    let slot = doc.entry(field.to_string()).or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
        .ok_or_else(|| StoreError::Malformed(format!("field {} is not an array", field)))
}
