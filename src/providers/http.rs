//! Reqwest-backed provider clients.
//!
//! Thin JSON clients for services exposing the matching POST endpoints:
//!
//! - `POST {base}/embed`    `{"text"}` → `{"vector"}`
//! - `POST {base}/search`   `{"user_id","vector","top_k"}` → `{"matches"}`
//! - `POST {base}/chunks`   `{"user_id","chunk_ids"}` → `{"chunks"}`
//! - `POST {base}/generate` `{"prompt","max_tokens"}` → `{"text","usage"}`
//!
//! Transport and non-2xx failures map to
//! [`UpstreamUnavailable`](crate::HeimdallError::UpstreamUnavailable);
//! deadline enforcement lives in the orchestrator, not here.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamService;
use crate::types::{Chunk, ChunkMatch, Embedding, GenerationOutput, Usage};
use crate::{HeimdallError, Result};

use super::traits::{EmbeddingProvider, GenerationProvider, RetrievalProvider};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    vector: Vec<f32>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    user_id: &'a str,
    vector: &'a [f32],
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    matches: Vec<ChunkMatch>,
}

#[derive(Serialize)]
struct ChunksRequest<'a> {
    user_id: &'a str,
    chunk_ids: &'a [String],
}

#[derive(Deserialize)]
struct ChunksResponse {
    chunks: Vec<Chunk>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
    usage: Usage,
}

// ============================================================================
// Shared plumbing
// ============================================================================

#[derive(Clone)]
struct JsonEndpoint {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl JsonEndpoint {
    fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        service: UpstreamService,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/{path}", self.base_url.trim_end_matches('/'));
        let mut request = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| upstream_err(service, e))?
            .error_for_status()
            .map_err(|e| upstream_err(service, e))?;
        response.json().await.map_err(|e| upstream_err(service, e))
    }
}

fn upstream_err(service: UpstreamService, e: reqwest::Error) -> HeimdallError {
    HeimdallError::UpstreamUnavailable {
        service,
        reason: e.to_string(),
    }
}

// ============================================================================
// Clients
// ============================================================================

/// HTTP client for an embedding service.
pub struct HttpEmbeddingClient {
    endpoint: JsonEndpoint,
}

impl HttpEmbeddingClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            endpoint: JsonEndpoint::new(base_url, None),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.endpoint.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    fn name(&self) -> &str {
        "http-embedding"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let response: EmbedResponse = self
            .endpoint
            .post("embed", UpstreamService::Embedding, &EmbedRequest { text })
            .await?;
        Ok(Embedding::new(response.vector))
    }
}

/// HTTP client for a similarity-search service that also serves chunk
/// bodies.
pub struct HttpRetrievalClient {
    endpoint: JsonEndpoint,
}

impl HttpRetrievalClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            endpoint: JsonEndpoint::new(base_url, None),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.endpoint.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl RetrievalProvider for HttpRetrievalClient {
    fn name(&self) -> &str {
        "http-retrieval"
    }

    async fn search(
        &self,
        user_id: &str,
        vector: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ChunkMatch>> {
        let response: SearchResponse = self
            .endpoint
            .post(
                "search",
                UpstreamService::Retrieval,
                &SearchRequest {
                    user_id,
                    vector: &vector.values,
                    top_k,
                },
            )
            .await?;
        Ok(response.matches)
    }

    async fn fetch_chunks(&self, user_id: &str, chunk_ids: &[String]) -> Result<Vec<Chunk>> {
        let response: ChunksResponse = self
            .endpoint
            .post(
                "chunks",
                UpstreamService::Retrieval,
                &ChunksRequest { user_id, chunk_ids },
            )
            .await?;
        Ok(response.chunks)
    }
}

/// HTTP client for the generation service.
pub struct HttpGenerationClient {
    endpoint: JsonEndpoint,
}

impl HttpGenerationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            endpoint: JsonEndpoint::new(base_url, None),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.endpoint.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerationClient {
    fn name(&self) -> &str {
        "http-generation"
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<GenerationOutput> {
        let response: GenerateResponse = self
            .endpoint
            .post(
                "generate",
                UpstreamService::Generation,
                &GenerateRequest { prompt, max_tokens },
            )
            .await?;
        Ok(GenerationOutput {
            text: response.text,
            usage: response.usage,
        })
    }
}
