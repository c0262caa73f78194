//! Inbound query request and validation.

use serde::{Deserialize, Serialize};

use crate::{HeimdallError, Result};

/// Longest accepted query text, in characters.
const MAX_QUERY_CHARS: usize = 8_192;

/// Upper bound on requested retrieval depth.
const MAX_TOP_K: usize = 50;

/// Upper bound on requested completion length.
const MAX_GENERATION_TOKENS: u32 = 4_096;

/// Retrieval parameters supplied by the client.
///
/// Part of the L1 cache key: two requests with the same text but
/// different parameters are distinct cached answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalParams {
    /// Number of chunks to retrieve.
    pub top_k: usize,
    /// Completion token budget for generation.
    pub max_tokens: u32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_tokens: 512,
        }
    }
}

/// A client query against the user's stored documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub user_id: String,
    pub query_text: String,
    #[serde(default)]
    pub params: RetrievalParams,
}

impl QueryRequest {
    pub fn new(user_id: impl Into<String>, query_text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            query_text: query_text.into(),
            params: RetrievalParams::default(),
        }
    }

    pub fn with_params(mut self, params: RetrievalParams) -> Self {
        self.params = params;
        self
    }

    /// Reject malformed requests before any admission or cache state is
    /// touched.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.is_empty() {
            return Err(HeimdallError::InvalidInput("empty user_id".into()));
        }
        if self
            .user_id
            .chars()
            .any(|c| c == ':' || c.is_whitespace() || c.is_control())
        {
            // ':' is the cache key prefix separator; a user id containing
            // it could alias another user's prefix.
            return Err(HeimdallError::InvalidInput(
                "user_id must not contain ':' or whitespace".into(),
            ));
        }
        if self.query_text.trim().is_empty() {
            return Err(HeimdallError::InvalidInput("empty query_text".into()));
        }
        if self.query_text.chars().count() > MAX_QUERY_CHARS {
            return Err(HeimdallError::InvalidInput(format!(
                "query_text exceeds {MAX_QUERY_CHARS} characters"
            )));
        }
        if self.params.top_k == 0 || self.params.top_k > MAX_TOP_K {
            return Err(HeimdallError::InvalidInput(format!(
                "top_k must be in 1..={MAX_TOP_K}"
            )));
        }
        if self.params.max_tokens == 0 || self.params.max_tokens > MAX_GENERATION_TOKENS {
            return Err(HeimdallError::InvalidInput(format!(
                "max_tokens must be in 1..={MAX_GENERATION_TOKENS}"
            )));
        }
        Ok(())
    }

    /// Canonical form of the query text used for cache keys: trimmed,
    /// lowercased, internal whitespace runs collapsed to single spaces.
    ///
    /// Exact-match only — no semantic normalization. Two queries differing
    /// by one character remain different keys.
    pub fn normalized_query(&self) -> String {
        self.query_text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}
