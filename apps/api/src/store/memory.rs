use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Collection, Document, DocumentStore, Query, StoreError, WriteBatch, WriteOp};

/// In-process document store.
///
/// Batches are applied under one write lock after every merge target has been
/// checked, so a failing batch leaves no partial writes.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<(Collection, String), Value>>,
    writes_applied: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total individual write operations applied since creation.
    #[cfg(test)]
    pub fn writes_applied(&self) -> usize {
        self.writes_applied.load(Ordering::SeqCst)
    }

    /// Makes every subsequent commit fail, simulating a backend outage.
    #[cfg(test)]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub async fn count(&self, collection: Collection) -> usize {
        self.docs
            .read()
            .await
            .keys()
            .filter(|(c, _)| *c == collection)
            .count()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs
            .get(&(collection, id.to_string()))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|((c, _), data)| *c == query.collection && query.matches(data))
            .map(|((_, id), data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }

        let ops = batch.into_ops();
        let mut docs = self.docs.write().await;

        // A merge may target a document created earlier in the same batch.
        let mut pending_sets: Vec<(Collection, &str)> = Vec::new();
        for op in &ops {
            match op {
                WriteOp::Set { collection, id, .. } => {
                    pending_sets.push((*collection, id.as_str()))
                }
                WriteOp::Merge { collection, id, .. } => {
                    let exists = docs.contains_key(&(*collection, id.clone()))
                        || pending_sets.contains(&(*collection, id.as_str()));
                    if !exists {
                        return Err(StoreError::Missing {
                            collection: *collection,
                            id: id.clone(),
                        });
                    }
                }
                WriteOp::Delete { .. } => {}
            }
        }

        let count = ops.len();
        for op in ops {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    data,
                } => {
                    docs.insert((collection, id), data);
                }
                WriteOp::Merge {
                    collection,
                    id,
                    patch,
                } => {
                    if let Some(Value::Object(existing)) = docs.get_mut(&(collection, id)) {
                        existing.extend(patch);
                    }
                }
                WriteOp::Delete { collection, id } => {
                    docs.remove(&(collection, id));
                }
            }
        }
        self.writes_applied.fetch_add(count, Ordering::SeqCst);
        Ok(())
    }
}
