//! Heimdall error types

use std::time::Duration;

use crate::limiter::LimitTier;
use crate::types::Denial;

/// External service a pipeline call was routed to.
///
/// Used for error classification, retry policy, and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamService {
    Embedding,
    Retrieval,
    Generation,
}

impl UpstreamService {
    /// Stable lowercase name for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamService::Embedding => "embedding",
            UpstreamService::Retrieval => "retrieval",
            UpstreamService::Generation => "generation",
        }
    }
}

impl std::fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heimdall error types
#[derive(Debug, thiserror::Error)]
pub enum HeimdallError {
    /// Request refused by a rate-limit tier. Expected, recoverable: the
    /// client retries after `retry_after`.
    #[error("admission denied by {tier} limit, retry after {retry_after:?}")]
    AdmissionDenied {
        tier: LimitTier,
        retry_after: Duration,
    },

    /// An external dependency failed. Idempotent read-only calls
    /// (embedding, retrieval) are retried once internally before this
    /// surfaces; the billable generation call is not.
    #[error("{service} service unavailable: {reason}")]
    UpstreamUnavailable {
        service: UpstreamService,
        reason: String,
    },

    /// An external dependency exceeded its deadline. Kept separate from
    /// [`UpstreamUnavailable`](Self::UpstreamUnavailable) so a generation
    /// timeout is never silently retried into a double-billed request.
    #[error("{service} call timed out after {elapsed:?}")]
    UpstreamTimeout {
        service: UpstreamService,
        elapsed: Duration,
    },

    /// Request rejected before any state mutation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Builder/configuration misuse.
    #[error("configuration error: {0}")]
    Configuration(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HeimdallError {
    /// Whether an internal retry is permitted for this error.
    ///
    /// Only upstream failures from idempotent read-only services qualify.
    /// Generation errors are never transient here — replaying a billable
    /// call is an explicit caller opt-in, not a default.
    pub fn is_transient(&self) -> bool {
        match self {
            HeimdallError::UpstreamUnavailable { service, .. }
            | HeimdallError::UpstreamTimeout { service, .. } => {
                !matches!(service, UpstreamService::Generation)
            }
            _ => false,
        }
    }

    /// Retry-after hint, present only for admission denials.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            HeimdallError::AdmissionDenied { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Client-facing denial body, present only for admission denials.
    ///
    /// Serializes to `{denied: true, retry_after_seconds, limiting_tier}`.
    pub fn denial(&self) -> Option<Denial> {
        match self {
            HeimdallError::AdmissionDenied { tier, retry_after } => Some(Denial {
                denied: true,
                retry_after_seconds: retry_after.as_secs(),
                limiting_tier: *tier,
            }),
            _ => None,
        }
    }
}

/// Result type alias for Heimdall operations
pub type Result<T> = std::result::Result<T, HeimdallError>;
