//! Provider traits for the external services the pipeline composes.
//!
//! Each service gets its own narrow trait rather than one "god trait",
//! so tests can mock exactly the calls they care about and deployments
//! can mix transports (HTTP here, gRPC elsewhere) per service.

use async_trait::async_trait;

use crate::Result;
use crate::types::{Chunk, ChunkMatch, Embedding, GenerationOutput};

/// Turns text into a fixed-length vector.
///
/// Deterministic and read-only, so the pipeline may retry it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Vector-similarity search over a user's document chunks.
///
/// `search` returns the ranked selection; `fetch_chunks` resolves chunk
/// ids to current bodies. Both are read-only and retryable. Bodies are
/// always fetched through this call, never cached — see
/// [`ContextCache`](crate::cache::ContextCache).
#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    async fn search(
        &self,
        user_id: &str,
        vector: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ChunkMatch>>;

    async fn fetch_chunks(&self, user_id: &str, chunk_ids: &[String]) -> Result<Vec<Chunk>>;
}

/// The billable text-generation service.
///
/// Never auto-retried by the pipeline: a duplicate call is a duplicate
/// charge. Callers opt in via the builder if their service deduplicates.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<GenerationOutput>;
}
