//! External service interfaces consumed by the pipeline.
//!
//! The embedding, retrieval, and generation services are out of scope —
//! this module defines the narrow traits the orchestrator calls them
//! through, the shared retry helper for the idempotent ones, and (behind
//! the `http` feature) reqwest-backed clients for services exposing the
//! matching JSON endpoints.

#[cfg(feature = "http")]
pub mod http;
pub mod retry;
pub mod traits;

#[cfg(feature = "http")]
pub use http::{HttpEmbeddingClient, HttpGenerationClient, HttpRetrievalClient};
pub use retry::RetryConfig;
pub use traits::{EmbeddingProvider, GenerationProvider, RetrievalProvider};
