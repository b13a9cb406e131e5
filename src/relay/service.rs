// Relay Service - the three operations behind the gateway
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::VECTOR_DIMENSION,
    embeddings::Embedder,
    errors::{RelayError, RelayResult},
    splitter::{parse_chunk_size, TextSplitter},
    store::{flatten_metadata, Match, UpsertAck, VectorRecord, VectorStore, TEXT_KEY},
};

/// A document submitted for ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub memory_text: String,
    /// Accepted but not stored
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct CreateIndexParams {
    pub index_name: String,
}

#[derive(Debug, Clone)]
pub struct UpsertParams {
    pub index_name: String,
    pub namespace: String,
    /// Raw request value; checked when the document is split
    pub chunk_size: Value,
    pub document: Document,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub index_name: String,
    pub namespace: String,
    pub query: String,
    pub top_k: usize,
}

#[derive(Clone)]
pub struct RelayService {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunk_overlap: usize,
}

impl RelayService {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            chunk_overlap,
        }
    }

    pub fn store_id(&self) -> &'static str {
        self.store.id()
    }

    /// Ask the store whether it is reachable with our credentials.
    pub async fn check_store(&self) -> RelayResult<()> {
        self.store.health_check().await
    }

    pub async fn create_index(&self, params: CreateIndexParams) -> RelayResult<Value> {
        info!(
            index = %params.index_name,
            dimension = VECTOR_DIMENSION,
            store = self.store.id(),
            "Creating index"
        );
        self.store
            .create_index(&params.index_name, VECTOR_DIMENSION)
            .await
    }

    /// Split, embed and store a document.
    ///
    /// Batches already written stay written if a later batch fails.
    pub async fn upsert_document(&self, params: UpsertParams) -> RelayResult<UpsertAck> {
        let chunk_size = parse_chunk_size(&params.chunk_size)?;
        let splitter = TextSplitter::new(chunk_size, self.chunk_overlap)?;

        if params.document.metadata.is_some() {
            debug!(index = %params.index_name, "Ignoring document metadata");
        }

        let chunks = splitter.create_chunks(&params.document.memory_text);
        if chunks.is_empty() {
            return Ok(UpsertAck {
                upserted_count: 0,
                ids: Vec::new(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_documents(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RelayError::Downstream(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, values)| VectorRecord {
                id: Uuid::new_v4().to_string(),
                values,
                metadata: flatten_metadata(&json!({
                    TEXT_KEY: chunk.text,
                    "loc": { "lines": { "from": chunk.lines.from, "to": chunk.lines.to } },
                })),
            })
            .collect();
        let chunk_count = records.len();

        let ack = self
            .store
            .upsert(&params.index_name, &params.namespace, records)
            .await?;

        info!(
            index = %params.index_name,
            namespace = %params.namespace,
            chunk_size,
            chunks = chunk_count,
            upserted = ack.upserted_count,
            "Document upserted"
        );
        Ok(ack)
    }

    pub async fn search(&self, params: SearchParams) -> RelayResult<Vec<Match>> {
        let vector = self.embedder.embed_query(&params.query).await?;
        let hits = self
            .store
            .query(&params.index_name, &params.namespace, vector, params.top_k)
            .await?;

        info!(
            index = %params.index_name,
            namespace = %params.namespace,
            top_k = params.top_k,
            results = hits.len(),
            "Similarity search completed"
        );
        Ok(hits.into_iter().map(Match::from).collect())
    }
}
