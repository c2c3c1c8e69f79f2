// Document store: collection-keyed JSON documents behind a single trait.
// Postgres is the production backend; the in-memory backend serves tests and local runs.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document {collection}/{id} does not exist")]
    Missing { collection: Collection, id: String },

    #[error("document decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The collections the service reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Jobs,
    Applications,
    Notifications,
    Users,
    Settings,
    SentEmails,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Jobs => "jobs",
            Collection::Applications => "applications",
            Collection::Notifications => "notifications",
            Collection::Users => "users",
            Collection::Settings => "settings",
            Collection::SentEmails => "sentEmails",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw stored document.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(self) -> Result<Record<T>, StoreError> {
        Ok(Record {
            id: self.id,
            data: serde_json::from_value(self.data)?,
        })
    }
}

/// A typed document together with its id. Serializes flat: `{"id": ..., <fields>}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

/// Equality-filtered scan over one collection.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: Collection,
    pub filters: Vec<(String, Value)>,
}

impl Query {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    /// True if every filter field of `data` equals the filter value.
    pub fn matches(&self, data: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected))
    }

    /// The filters as a JSON object, suitable for a JSONB containment check.
    pub fn filter_object(&self) -> Value {
        let map: Map<String, Value> = self.filters.iter().cloned().collect();
        Value::Object(map)
    }
}

#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create or fully replace a document.
    Set {
        collection: Collection,
        id: String,
        data: Value,
    },
    /// Shallow-merge top-level fields into an existing document.
    /// Fails the whole batch if the document does not exist.
    Merge {
        collection: Collection,
        id: String,
        patch: Map<String, Value>,
    },
    /// Delete a document. Deleting a missing document is a no-op.
    Delete { collection: Collection, id: String },
}

/// A group of writes that commits atomically: all apply or none do.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(
        &mut self,
        collection: Collection,
        id: &str,
        data: &T,
    ) -> Result<&mut Self, StoreError> {
        self.ops.push(WriteOp::Set {
            collection,
            id: id.to_string(),
            data: serde_json::to_value(data)?,
        });
        Ok(self)
    }

    pub fn merge(&mut self, collection: Collection, id: &str, patch: Value) -> &mut Self {
        let patch = match patch {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.ops.push(WriteOp::Merge {
            collection,
            id: id.to_string(),
            patch,
        });
        self
    }

    pub fn delete(&mut self, collection: Collection, id: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection,
            id: id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Backend-agnostic document store.
///
/// Last-write-wins: there are no version fields or conditional writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Opaque id for a new document.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Fetches and decodes a single document.
pub async fn get_record<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
) -> Result<Option<Record<T>>, StoreError> {
    match store.get(collection, id).await? {
        Some(doc) => Ok(Some(doc.decode()?)),
        None => Ok(None),
    }
}

/// Runs a query and decodes every result.
pub async fn query_records<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    query: &Query,
) -> Result<Vec<Record<T>>, StoreError> {
    store
        .query(query)
        .await?
        .into_iter()
        .map(Document::decode)
        .collect()
}

/// Writes a single document outside of any larger batch.
pub async fn set_record<T: Serialize>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    data: &T,
) -> Result<(), StoreError> {
    let mut batch = WriteBatch::new();
    batch.set(collection, id, data)?;
    store.commit(batch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_matches_all_filters() {
        let q = Query::new(Collection::Notifications)
            .where_eq("userId", "u1")
            .where_eq("read", false);
        assert!(q.matches(&json!({"userId": "u1", "read": false, "message": "hi"})));
        assert!(!q.matches(&json!({"userId": "u1", "read": true})));
        assert!(!q.matches(&json!({"read": false})));
    }

    #[test]
    fn test_filter_object() {
        let q = Query::new(Collection::Jobs).where_eq("userId", "owner");
        assert_eq!(q.filter_object(), json!({"userId": "owner"}));
    }

    #[test]
    fn test_record_serializes_flat() {
        let r = Record {
            id: "abc".to_string(),
            data: json!({"title": "Engineer"}),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, json!({"id": "abc", "title": "Engineer"}));
    }

    #[test]
    fn test_batch_merge_ignores_non_object_patch() {
        let mut batch = WriteBatch::new();
        batch.merge(Collection::Jobs, "j1", json!("nope"));
        match &batch.into_ops()[0] {
            WriteOp::Merge { patch, .. } => assert!(patch.is_empty()),
            other => panic!("unexpected op {other:?}"),
        }
    }
}
