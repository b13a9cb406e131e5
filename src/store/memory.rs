//! In-process vector store
//!
//! Brute-force cosine similarity over a concurrent map. Used for local
//! development (`VECTOR_STORE=memory`) and as the fake store in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};

use super::{IndexDescription, ScoredVector, UpsertAck, VectorRecord, VectorStore};
use crate::errors::{RelayError, RelayResult};

struct MemoryIndex {
    dimension: usize,
    namespaces: HashMap<String, Vec<VectorRecord>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    indexes: DashMap<String, MemoryIndex>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn vector_count(&self, index: &str, namespace: &str) -> usize {
        self.indexes
            .get(index)
            .and_then(|idx| idx.namespaces.get(namespace).map(Vec::len))
            .unwrap_or(0)
    }

    /// Stored records of a namespace, in insertion order
    pub fn records(&self, index: &str, namespace: &str) -> Vec<VectorRecord> {
        self.indexes
            .get(index)
            .and_then(|idx| idx.namespaces.get(namespace).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn id(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> RelayResult<()> {
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> RelayResult<IndexDescription> {
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| RelayError::IndexNotFound(name.to_string()))?;
        Ok(IndexDescription {
            name: name.to_string(),
            dimension: index.dimension,
            host: None,
        })
    }

    async fn create_index(&self, name: &str, dimension: usize) -> RelayResult<Value> {
        let entry = self
            .indexes
            .entry(name.to_string())
            .or_insert_with(|| MemoryIndex {
                dimension,
                namespaces: HashMap::new(),
            });

        if entry.dimension != dimension {
            return Err(RelayError::Downstream(format!(
                "Index '{}' already exists with dimension {}",
                name, entry.dimension
            )));
        }

        Ok(json!({ "name": name, "dimension": dimension }))
    }

    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> RelayResult<UpsertAck> {
        let mut idx = self
            .indexes
            .get_mut(index)
            .ok_or_else(|| RelayError::IndexNotFound(index.to_string()))?;

        if let Some(bad) = records.iter().find(|r| r.values.len() != idx.dimension) {
            return Err(RelayError::Downstream(format!(
                "Vector dimension {} does not match the dimension of the index {}",
                bad.values.len(),
                idx.dimension
            )));
        }

        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let stored = idx.namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            match stored.iter_mut().find(|existing| existing.id == record.id) {
                Some(existing) => *existing = record,
                None => stored.push(record),
            }
        }

        Ok(UpsertAck {
            upserted_count: ids.len(),
            ids,
        })
    }

    async fn query(
        &self,
        index: &str,
        namespace: &str,
        vector: Vec<f32>,
        top_k: usize,
    ) -> RelayResult<Vec<ScoredVector>> {
        let idx = self
            .indexes
            .get(index)
            .ok_or_else(|| RelayError::IndexNotFound(index.to_string()))?;

        if vector.len() != idx.dimension {
            return Err(RelayError::Downstream(format!(
                "Query vector dimension {} does not match the dimension of the index {}",
                vector.len(),
                idx.dimension
            )));
        }

        let mut scored: Vec<ScoredVector> = idx
            .namespaces
            .get(namespace)
            .map(|records| {
                records
                    .iter()
                    .map(|r| ScoredVector {
                        id: r.id.clone(),
                        score: cosine_similarity(&vector, &r.values),
                        metadata: Some(r.metadata.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Calculate cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
