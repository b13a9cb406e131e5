//! OpenAI embeddings client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Embedder;
use crate::config::{RelayConfig, VECTOR_DIMENSION};
use crate::errors::{RelayError, RelayResult};

/// Maximum number of inputs per `/embeddings` request.
const BATCH_SIZE: usize = 512;

pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiEmbeddings {
    pub fn new(api_key: &str, api_base: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension: VECTOR_DIMENSION,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            &config.openai_api_key,
            &config.openai_api_base,
            &config.embedding_model,
        )
    }

    async fn embed_batch(&self, batch: &[String]) -> RelayResult<Vec<Vec<f32>>> {
        // Newlines degrade ada-002 embedding quality
        let input: Vec<String> = batch.iter().map(|t| t.replace('\n', " ")).collect();

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(RelayError::Downstream(format!(
                "OpenAI embeddings returned {}: {}",
                status, message
            )));
        }

        let mut result: EmbeddingResponse = response.json().await?;
        if result.data.len() != batch.len() {
            return Err(RelayError::Downstream(format!(
                "Expected {} embeddings, got {}",
                batch.len(),
                result.data.len()
            )));
        }

        result.data.sort_by_key(|d| d.index);
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbeddings {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_documents(&self, texts: &[String]) -> RelayResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            debug!(model = %self.model, inputs = batch.len(), "Requesting embeddings");
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> RelayResult<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::Downstream("No embedding returned".to_string()))
    }
}
