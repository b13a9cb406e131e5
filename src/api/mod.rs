//! REST API for the relay
//!
//! Three password-gated POST endpoints (`/search`, `/upsert`, `/createIndex`)
//! and an unauthenticated `/health` probe.

pub mod requests;
pub mod routes;

pub use requests::{CreateIndexRequest, SearchRequest, UpsertRequest};
pub use routes::{configure, AppState};
