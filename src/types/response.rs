//! Client-facing response types.

use serde::{Deserialize, Serialize};

use crate::limiter::LimitTier;
use crate::types::Usage;

/// Outcome of one cache tier lookup for a single request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierOutcome {
    Hit,
    #[default]
    Miss,
}

impl TierOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, TierOutcome::Hit)
    }
}

/// Per-tier cache provenance for a request.
///
/// An L1 hit short-circuits the pipeline, so `l2`/`l3` stay `Miss` in
/// that case — they were never consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheProvenance {
    pub l1: TierOutcome,
    pub l2: TierOutcome,
    pub l3: TierOutcome,
}

/// How admission control handled the request.
///
/// `Degraded` means the shared store was unreachable and the request was
/// admitted fail-open rather than checked against its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStatus {
    Allowed,
    Degraded,
}

/// Chunk reference included in the answer's source list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub chunk_id: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A completed answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub cache_provenance: CacheProvenance,
    /// Generation spend for this request. 0 for cached answers.
    pub cost_usd: f64,
    pub rate_limit_status: RateLimitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Body returned to a client refused admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Denial {
    pub denied: bool,
    pub retry_after_seconds: u64,
    pub limiting_tier: LimitTier,
}
