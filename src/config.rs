// Relay Service Configuration
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Dimension of `text-embedding-ada-002` vectors; every index is created with it.
pub const VECTOR_DIMENSION: usize = 1536;

/// Number of matches returned by `/search` when the caller does not ask for more.
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Pinecone,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "memory" => Ok(Self::Memory),
            other => bail!("Unknown VECTOR_STORE '{}', expected 'pinecone' or 'memory'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub port: u16,
    pub host: String,

    // Shared secret checked on every request
    pub password: String,

    // Vector store
    pub store_backend: StoreBackend,
    pub pinecone_api_key: Option<String>,
    pub pinecone_environment: Option<String>,
    pub pinecone_controller_url: Option<String>,

    // Embeddings
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub embedding_model: String,

    // Text splitting
    pub chunk_overlap: usize,

    // Logging
    pub json_logs: bool,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        let store_backend =
            StoreBackend::parse(&std::env::var("VECTOR_STORE").unwrap_or_else(|_| "pinecone".to_string()))?;

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            password: required("PASSWORD")?,

            store_backend,
            pinecone_api_key: std::env::var("PINECONE_API_KEY").ok(),
            pinecone_environment: std::env::var("PINECONE_ENVIRONMENT").ok(),
            pinecone_controller_url: std::env::var("PINECONE_CONTROLLER_URL").ok(),

            openai_api_key: required("OPENAI_API_KEY")?,
            openai_api_base: std::env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-ada-002".to_string()),

            chunk_overlap: std::env::var("CHUNK_OVERLAP")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .context("CHUNK_OVERLAP must be a non-negative integer")?,

            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };

        if config.store_backend == StoreBackend::Pinecone {
            if config.pinecone_api_key.is_none() {
                bail!("PINECONE_API_KEY is required when VECTOR_STORE=pinecone");
            }
            if config.pinecone_environment.is_none() && config.pinecone_controller_url.is_none() {
                bail!("PINECONE_ENVIRONMENT is required when VECTOR_STORE=pinecone");
            }
        }

        Ok(config)
    }

    /// Base URL of the Pinecone control plane.
    pub fn pinecone_controller(&self) -> Option<String> {
        self.pinecone_controller_url
            .clone()
            .or_else(|| {
                self.pinecone_environment
                    .as_ref()
                    .map(|env| format!("https://controller.{}.pinecone.io", env))
            })
            .map(|url| url.trim_end_matches('/').to_string())
    }
}

fn required(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => bail!("Environment variable '{}' is required but not set", key),
    }
}
