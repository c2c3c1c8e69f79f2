use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use super::{Collection, Document, DocumentStore, Query, StoreError, WriteBatch, WriteOp};

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    data: Value,
}

/// PostgreSQL-backed store. Every collection lives in the single `documents`
/// table keyed by `(collection, id)` with a JSONB body.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|r| Document {
            id: r.id,
            data: r.data,
        }))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT id, data FROM documents WHERE collection = $1 AND data @> $2",
        )
        .bind(query.collection.as_str())
        .bind(query.filter_object())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Document {
                id: r.id,
                data: r.data,
            })
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let count = batch.len();
        let mut tx = self.pool.begin().await?;

        for op in batch.into_ops() {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    data,
                } => {
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, data)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (collection, id)
                        DO UPDATE SET data = EXCLUDED.data, updated_at = now()
                        "#,
                    )
                    .bind(collection.as_str())
                    .bind(&id)
                    .bind(&data)
                    .execute(&mut *tx)
                    .await?;
                }
                WriteOp::Merge {
                    collection,
                    id,
                    patch,
                } => {
                    let result = sqlx::query(
                        r#"
                        UPDATE documents
                        SET data = data || $3, updated_at = now()
                        WHERE collection = $1 AND id = $2
                        "#,
                    )
                    .bind(collection.as_str())
                    .bind(&id)
                    .bind(Value::Object(patch))
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        // Dropping `tx` rolls back everything written so far.
                        return Err(StoreError::Missing { collection, id });
                    }
                }
                WriteOp::Delete { collection, id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection.as_str())
                        .bind(&id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        debug!("Committed batch of {count} writes");
        Ok(())
    }
}
