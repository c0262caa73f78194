//! Retrieval and generation payload types.

use serde::{Deserialize, Serialize};

/// Fixed-length embedding vector for a piece of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    pub dimensions: usize,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        let dimensions = values.len();
        Self { values, dimensions }
    }

    /// Little-endian byte view of the vector, used for stable hashing.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.values.len() * 4);
        for v in &self.values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }
}

/// One entry in a ranked retrieval selection: which chunk, how similar.
///
/// Deliberately carries no chunk body — bodies are fetched fresh because
/// chunk content changes independently of the relevance decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub chunk_id: String,
    pub score: f32,
}

/// A document chunk body as returned by the retrieval service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    /// Human-readable origin (document title, section), if the service
    /// provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Token usage statistics reported by the generation service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Output of a generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub text: String,
    pub usage: Usage,
}
