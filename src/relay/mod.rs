// Relay operations - index provisioning, ingestion and retrieval
pub mod service;

pub use service::{CreateIndexParams, Document, RelayService, SearchParams, UpsertParams};
