use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Hard cap on operations carried by a single batch commit.
pub const MAX_BATCH_OPERATIONS: usize = 500;

/// key: document-store -> collection snapshot entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone())
            .with_context(|| format!("failed to decode document {}", self.id))
    }
}

/// Conjunction of field equality clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| data.get(field).map_or(false, |actual| values_equal(actual, expected)))
    }

    /// Containment document used by JSONB backends (`data @> filter`).
    pub fn as_json(&self) -> Value {
        let mut object = Map::new();
        for (field, value) in &self.clauses {
            object.insert(field.clone(), value.clone());
        }
        Value::Object(object)
    }
}

// 2 and 2.0 compare equal, as they do under JSONB containment.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    Set { id: String, data: Value },
    Delete { id: String },
}

/// key: document-store -> bounded multi-document write
#[derive(Debug, Clone)]
pub struct WriteBatch {
    collection: String,
    operations: Vec<BatchOperation>,
}

impl WriteBatch {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            operations: Vec::new(),
        }
    }

    pub fn set(&mut self, id: impl Into<String>, data: Value) -> Result<()> {
        self.push(BatchOperation::Set {
            id: id.into(),
            data,
        })
    }

    pub fn delete(&mut self, id: impl Into<String>) -> Result<()> {
        self.push(BatchOperation::Delete { id: id.into() })
    }

    fn push(&mut self, operation: BatchOperation) -> Result<()> {
        if self.is_full() {
            bail!(
                "write batch for {} already holds {MAX_BATCH_OPERATIONS} operations",
                self.collection
            );
        }
        self.operations.push(operation);
        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn operations(&self) -> &[BatchOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.operations.len() >= MAX_BATCH_OPERATIONS
    }
}

/// key: document-store -> collaborator interface
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents of `collection` matching every clause of `filter`, in insertion order.
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    /// Shallow merge of `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<()>;

    /// Applies every operation of the batch or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    fn generate_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

pub(crate) fn ensure_object(fields: &Value) -> Result<&Map<String, Value>> {
    fields
        .as_object()
        .context("document fields must be a JSON object")
}

pub(crate) fn ensure_batch_within_limit(batch: &WriteBatch) -> Result<()> {
    if batch.len() > MAX_BATCH_OPERATIONS {
        bail!(
            "write batch for {} carries {} operations, limit is {MAX_BATCH_OPERATIONS}",
            batch.collection(),
            batch.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_requires_every_clause() {
        let filter = Filter::new().eq("userId", "0xabc").eq("autoRenew", true);
        assert!(filter.matches(&json!({"userId": "0xabc", "autoRenew": true, "x": 1})));
        assert!(!filter.matches(&json!({"userId": "0xabc", "autoRenew": false})));
        assert!(!filter.matches(&json!({"userId": "0xabc"})));
        assert_eq!(filter.as_json(), json!({"userId": "0xabc", "autoRenew": true}));
    }

    #[test]
    fn filter_compares_numbers_by_value() {
        let filter = Filter::new().eq("serviceId", 2);
        assert!(filter.matches(&json!({"serviceId": 2.0})));
        assert!(!filter.matches(&json!({"serviceId": "2"})));
    }

    #[test]
    fn batch_refuses_operations_past_the_cap() {
        let mut batch = WriteBatch::new("plans");
        for index in 0..MAX_BATCH_OPERATIONS {
            batch.set(format!("doc-{index}"), json!({})).unwrap();
        }
        assert!(batch.is_full());
        assert!(batch.set("overflow", json!({})).is_err());
        assert_eq!(batch.len(), MAX_BATCH_OPERATIONS);
    }
}
