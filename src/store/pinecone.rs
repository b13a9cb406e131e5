//! Pinecone vector store connector
//!
//! Talks to the environment-scoped Pinecone API: the controller
//! (`controller.{environment}.pinecone.io`) manages indexes, each index
//! serves data-plane requests on its own host.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{IndexDescription, ScoredVector, UpsertAck, VectorRecord, VectorStore};
use crate::errors::{RelayError, RelayResult};

/// Maximum number of vectors per upsert request.
const UPSERT_BATCH_SIZE: usize = 100;

pub struct PineconeStore {
    client: reqwest::Client,
    api_key: String,
    controller_url: String,
    project_name: Option<String>,
    hosts: DashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct WhoAmIResponse {
    project_name: String,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    database: DatabaseInfo,
    status: Option<DatabaseStatus>,
}

#[derive(Debug, Deserialize)]
struct DatabaseInfo {
    name: String,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct DatabaseStatus {
    host: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    top_k: usize,
    vector: Vec<f32>,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredVector>,
}

impl PineconeStore {
    pub fn new(api_key: &str, controller_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            controller_url: controller_url.trim_end_matches('/').to_string(),
            project_name: None,
            hosts: DashMap::new(),
        }
    }

    /// Build a client and verify the API key before handing it out.
    pub async fn connect(api_key: &str, controller_url: &str) -> RelayResult<Self> {
        let mut store = Self::new(api_key, controller_url);
        let whoami = store.whoami().await?;
        info!(
            project = %whoami.project_name,
            controller = %store.controller_url,
            "Connected to Pinecone"
        );
        store.project_name = Some(whoami.project_name);
        Ok(store)
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    async fn whoami(&self) -> RelayResult<WhoAmIResponse> {
        let response = self
            .client
            .get(format!("{}/actions/whoami", self.controller_url))
            .header("Api-Key", &self.api_key)
            .send()
            .await?;
        let response = Self::ensure_success(response, "whoami").await?;
        Ok(response.json().await?)
    }

    /// Data-plane base URL for `index`, resolved once through the controller.
    async fn index_url(&self, index: &str) -> RelayResult<String> {
        if let Some(host) = self.hosts.get(index) {
            return Ok(host.clone());
        }

        let description = self.describe_index(index).await?;
        let host = description.host.ok_or_else(|| {
            RelayError::Downstream(format!("Index '{}' has no host yet", index))
        })?;
        let url = if host.contains("://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host)
        };

        self.hosts.insert(index.to_string(), url.clone());
        Ok(url)
    }

    async fn ensure_success(
        response: reqwest::Response,
        operation: &str,
    ) -> RelayResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RelayError::Downstream(format!(
            "Pinecone {} returned {}: {}",
            operation,
            status,
            body.trim()
        )))
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn id(&self) -> &'static str {
        "pinecone"
    }

    async fn health_check(&self) -> RelayResult<()> {
        self.whoami().await.map(|_| ())
    }

    async fn describe_index(&self, name: &str) -> RelayResult<IndexDescription> {
        let response = self
            .client
            .get(format!("{}/databases/{}", self.controller_url, name))
            .header("Api-Key", &self.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RelayError::IndexNotFound(name.to_string()));
        }
        let response = Self::ensure_success(response, "describe_index").await?;
        let described: DescribeIndexResponse = response.json().await?;

        Ok(IndexDescription {
            name: described.database.name,
            dimension: described.database.dimension,
            host: described.status.and_then(|s| s.host),
        })
    }

    async fn create_index(&self, name: &str, dimension: usize) -> RelayResult<Value> {
        let response = self
            .client
            .post(format!("{}/databases", self.controller_url))
            .header("Api-Key", &self.api_key)
            .json(&CreateIndexRequest { name, dimension })
            .send()
            .await?;
        let response = Self::ensure_success(response, "create_index").await?;

        // The controller answers 201 with a plain-text (often empty) body
        let body = response.text().await?;
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Ok(json!({ "name": name, "dimension": dimension }));
        }
        Ok(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string())))
    }

    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> RelayResult<UpsertAck> {
        let url = format!("{}/vectors/upsert", self.index_url(index).await?);
        let mut ack = UpsertAck {
            upserted_count: 0,
            ids: Vec::with_capacity(records.len()),
        };

        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let response = self
                .client
                .post(&url)
                .header("Api-Key", &self.api_key)
                .json(&UpsertRequest {
                    vectors: batch,
                    namespace,
                })
                .send()
                .await?;
            let response = Self::ensure_success(response, "upsert").await?;
            let upserted: UpsertResponse = response.json().await?;

            debug!(index, namespace, count = upserted.upserted_count, "Upserted batch");
            ack.upserted_count += upserted.upserted_count;
            ack.ids.extend(batch.iter().map(|r| r.id.clone()));
        }

        Ok(ack)
    }

    async fn query(
        &self,
        index: &str,
        namespace: &str,
        vector: Vec<f32>,
        top_k: usize,
    ) -> RelayResult<Vec<ScoredVector>> {
        let url = format!("{}/query", self.index_url(index).await?);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&QueryRequest {
                namespace,
                top_k,
                vector,
                include_metadata: true,
                include_values: false,
            })
            .send()
            .await?;
        let response = Self::ensure_success(response, "query").await?;
        let result: QueryResponse = response.json().await?;
        Ok(result.matches)
    }
}
