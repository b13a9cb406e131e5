// Vector Relay Main Entry Point
// Exposes /search, /upsert and /createIndex in front of the vector store
// and the embedding service
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use vector_relay::{
    api::{self, AppState},
    config::StoreBackend,
    embeddings::{Embedder, OpenAiEmbeddings},
    store::{InMemoryStore, PineconeStore, VectorStore},
    RelayConfig, RelayService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenv::dotenv().ok();
    let config = RelayConfig::from_env()?;

    // Initialize structured logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Vector Relay");

    // The store must be reachable before we accept requests
    let store: Arc<dyn VectorStore> = match config.store_backend {
        StoreBackend::Pinecone => {
            let api_key = config
                .pinecone_api_key
                .as_deref()
                .context("PINECONE_API_KEY is not set")?;
            let controller = config
                .pinecone_controller()
                .context("PINECONE_ENVIRONMENT is not set")?;
            let store = PineconeStore::connect(api_key, &controller)
                .await
                .context("Pinecone client init failed")?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory vector store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbeddings::from_config(&config));
    info!(
        store = store.id(),
        model = %config.embedding_model,
        dimension = embedder.dimension(),
        "Initialized relay services"
    );

    let relay = RelayService::new(store, embedder, config.chunk_overlap);
    let state = web::Data::new(AppState::new(relay, config.password.clone()));

    info!("Server running on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    info!("Vector Relay stopped");
    Ok(())
}
