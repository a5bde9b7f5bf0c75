use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use super::{ensure_batch_within_limit, ensure_object, BatchOperation, Document, DocumentStore, Filter, WriteBatch};

/// key: document-store-postgres -> JSONB collections in one table
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
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let rows = sqlx::query_as::<_, (String, Value)>(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = $1
              AND data @> $2
            ORDER BY seq ASC
            "#,
        )
        .bind(collection)
        .bind(filter.as_json())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to query collection {collection}"))?;

        Ok(rows
            .into_iter()
            .map(|(id, data)| Document { id, data })
            .collect())
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<()> {
        ensure_object(&fields)?;
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3,
                updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&fields)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update document {collection}/{id}"))?;

        if result.rows_affected() == 0 {
            bail!("document {collection}/{id} not found");
        }
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        ensure_batch_within_limit(&batch)?;
        let collection = batch.collection();
        let mut tx = self.pool.begin().await?;
        for operation in batch.operations() {
            match operation {
                BatchOperation::Set { id, data } => {
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, data)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (collection, id)
                        DO UPDATE SET
                            data = EXCLUDED.data,
                            updated_at = NOW()
                        "#,
                    )
                    .bind(collection)
                    .bind(id)
                    .bind(data)
                    .execute(&mut tx)
                    .await?;
                }
                BatchOperation::Delete { id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection)
                        .bind(id)
                        .execute(&mut tx)
                        .await?;
                }
            }
        }
        tx.commit()
            .await
            .with_context(|| format!("failed to commit batch for {collection}"))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete document {collection}/{id}"))?;
        Ok(())
    }
}
