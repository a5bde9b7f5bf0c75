use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ensure_batch_within_limit, ensure_object, BatchOperation, Document, DocumentStore, Filter, WriteBatch};

/// key: document-store-memory -> process-local collections
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, collection: &str, id: impl Into<String>, data: Value) {
        let mut collections = self.collections.write().await;
        upsert(collections.entry(collection.to_string()).or_default(), id.into(), data);
    }

    pub async fn get(&self, collection: &str, id: &str) -> Option<Document> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|doc| doc.id == id).cloned())
    }

    pub async fn len(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, Vec::len)
    }
}

fn upsert(documents: &mut Vec<Document>, id: String, data: Value) {
    match documents.iter_mut().find(|doc| doc.id == id) {
        Some(existing) => existing.data = data,
        None => documents.push(Document { id, data }),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|doc| filter.matches(&doc.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<()> {
        let fields = ensure_object(&fields)?;
        let mut collections = self.collections.write().await;
        let document = collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| anyhow!("document {collection}/{id} not found"))?;
        let target = document
            .data
            .as_object_mut()
            .ok_or_else(|| anyhow!("document {collection}/{id} is not an object"))?;
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        ensure_batch_within_limit(&batch)?;
        let mut collections = self.collections.write().await;
        let documents = collections.entry(batch.collection().to_string()).or_default();
        for operation in batch.operations() {
            match operation {
                BatchOperation::Set { id, data } => upsert(documents, id.clone(), data.clone()),
                BatchOperation::Delete { id } => documents.retain(|doc| &doc.id != id),
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(documents) = collections.get_mut(collection) {
            documents.retain(|doc| doc.id != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn update_merges_top_level_fields() {
        let store = MemoryDocumentStore::new();
        store
            .insert("subs", "a", json!({"endTime": 10, "autoRenew": true}))
            .await;

        store
            .update("subs", "a", json!({"autoRenew": false, "updatedAt": 5}))
            .await
            .unwrap();

        let doc = store.get("subs", "a").await.unwrap();
        assert_eq!(doc.data, json!({"endTime": 10, "autoRenew": false, "updatedAt": 5}));
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        assert!(store.update("subs", "ghost", json!({"a": 1})).await.is_err());
    }

    #[tokio::test]
    async fn query_keeps_insertion_order() {
        let store = MemoryDocumentStore::new();
        let mut batch = WriteBatch::new("plans");
        batch.set("b", json!({"serviceId": 1})).unwrap();
        batch.set("a", json!({"serviceId": 1})).unwrap();
        batch.set("c", json!({"serviceId": 2})).unwrap();
        store.commit(batch).await.unwrap();

        let ids: Vec<_> = store
            .query("plans", &Filter::new().eq("serviceId", 1))
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
