// Vector Relay - password-gated HTTP front for a vector store and an embedding service
// Splits documents into chunks, embeds them remotely and stores or queries them

pub mod api;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod relay;
pub mod splitter;
pub mod store;

pub use config::RelayConfig;
pub use errors::{RelayError, RelayResult};
pub use relay::RelayService;
