//! Request, response, and retrieval data types.

pub mod chunk;
pub mod request;
pub mod response;

pub use chunk::{Chunk, ChunkMatch, Embedding, GenerationOutput, Usage};
pub use request::{QueryRequest, RetrievalParams};
pub use response::{CacheProvenance, Denial, QueryResponse, RateLimitStatus, SourceRef, TierOutcome};
