// Vector Store Module - collections of embedded chunks
pub mod memory;
pub mod pinecone;

use crate::errors::RelayResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use memory::InMemoryStore;
pub use pinecone::PineconeStore;

/// Metadata key holding the original chunk text.
pub const TEXT_KEY: &str = "text";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredVector {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAck {
    pub upserted_count: usize,
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: usize,
    pub host: Option<String>,
}

/// A stored chunk returned from a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub page_content: String,
    pub metadata: Map<String, Value>,
}

impl From<ScoredVector> for Match {
    fn from(scored: ScoredVector) -> Self {
        let mut metadata = scored.metadata.unwrap_or_default();
        let page_content = match metadata.remove(TEXT_KEY) {
            Some(Value::String(text)) => text,
            _ => String::new(),
        };
        Self {
            page_content,
            metadata,
        }
    }
}

/// Flatten nested metadata into `a.b.c` keys; the stores only accept flat maps.
pub fn flatten_metadata(value: &Value) -> Map<String, Value> {
    fn walk(prefix: &str, value: &Value, out: &mut Map<String, Value>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    walk(&path, child, out);
                }
            }
            other => {
                out.insert(prefix.to_string(), other.clone());
            }
        }
    }

    let mut out = Map::new();
    walk("", value, &mut out);
    out
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend identifier (pinecone, memory)
    fn id(&self) -> &'static str;

    /// Verify credentials and reachability
    async fn health_check(&self) -> RelayResult<()>;

    /// Look up an index by name
    async fn describe_index(&self, name: &str) -> RelayResult<IndexDescription>;

    /// Ask the store to create an index; returns the store's acknowledgement as-is
    async fn create_index(&self, name: &str, dimension: usize) -> RelayResult<Value>;

    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> RelayResult<UpsertAck>;

    /// Nearest `top_k` vectors in `namespace`, in the store's ranking order
    async fn query(
        &self,
        index: &str,
        namespace: &str,
        vector: Vec<f32>,
        top_k: usize,
    ) -> RelayResult<Vec<ScoredVector>>;
}
