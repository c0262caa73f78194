//! Heimdall - admission control and caching for RAG query pipelines
//!
//! This crate is the gatekeeping layer in front of a retrieval-augmented
//! question-answering pipeline: sliding-window rate limiting with a
//! post-hoc cost ledger, three independent cache tiers (answers,
//! embeddings, context selections), document-change invalidation, and an
//! orchestrator that calls the external embedding/retrieval/generation
//! services only on cache misses.
//!
//! # Example
//!
//! ```rust,no_run
//! use heimdall::{Heimdall, QueryRequest};
//! use heimdall::providers::{HttpEmbeddingClient, HttpGenerationClient, HttpRetrievalClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> heimdall::Result<()> {
//!     let pipeline = Heimdall::builder()
//!         .embedding_provider(Arc::new(HttpEmbeddingClient::new("http://embed.internal")))
//!         .retrieval_provider(Arc::new(HttpRetrievalClient::new("http://search.internal")))
//!         .generation_provider(Arc::new(
//!             HttpGenerationClient::new("http://llm.internal").with_api_key("sk-your-key"),
//!         ))
//!         .build()?;
//!
//!     let response = pipeline
//!         .execute(&QueryRequest::new("user-42", "What is grace?"))
//!         .await?;
//!
//!     println!("{} (${:.4})", response.answer, response.cost_usd);
//!     Ok(())
//! }
//! ```
//!
//! # Failure behaviour
//!
//! The shared store being unreachable never fails a request: admission
//! fails open (tagged [`Decision::DegradedAllowed`](limiter::Decision)),
//! cache reads degrade to misses. The only user-visible failure from a
//! healthy deployment is the generation service going down.

pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod limiter;
pub mod pipeline;
pub mod providers;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use error::{HeimdallError, Result, UpstreamService};
pub use pipeline::{Heimdall, HeimdallBuilder, PipelineOrchestrator};

pub use cache::{ContextCache, EmbeddingCache, QueryResultCache};
pub use config::{CacheConfig, ContextConfig, PricingConfig, RateLimitConfig, TimeoutConfig};
pub use invalidation::InvalidationHook;
pub use limiter::{Decision, LimitTier, RateLimiter, SlotGuard};
pub use providers::RetryConfig;
pub use store::{MemoryStore, SharedStore};

// Re-export all wire types
pub use types::{
    CacheProvenance, Chunk, ChunkMatch, Denial, Embedding, GenerationOutput, QueryRequest,
    QueryResponse, RateLimitStatus, RetrievalParams, SourceRef, TierOutcome, Usage,
};
