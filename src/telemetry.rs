//! Telemetry metric name constants.
//!
//! Centralised metric names for heimdall operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `heimdall_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`, `_usd`).
//!
//! # Common labels
//!
//! - `tier` — cache tier ("l1" | "l2" | "l3") or limit tier name
//! - `service` — upstream service ("embedding" | "retrieval" | "generation")
//! - `decision` — admission outcome ("allowed" | "denied" | "degraded")
//! - `status` — request outcome: "ok" or "error"
//! - `component` — subsystem reporting a degraded store ("limiter" | "cache")

/// Total requests entering the pipeline.
///
/// Labels: `status` ("ok" | "error" | "denied").
pub const REQUESTS_TOTAL: &str = "heimdall_requests_total";

/// End-to-end request duration in seconds.
///
/// Labels: `cached` ("true" for L1 hits, "false" otherwise).
pub const REQUEST_DURATION_SECONDS: &str = "heimdall_request_duration_seconds";

/// Dollar cost of generation per request.
///
/// No labels. L1 hits record 0.
pub const REQUEST_COST_USD: &str = "heimdall_request_cost_usd";

/// Admission decisions made by the rate limiter.
///
/// Labels: `decision` ("allowed" | "denied" | "degraded"), and `tier`
/// (the violated tier) when denied.
pub const ADMISSION_DECISIONS_TOTAL: &str = "heimdall_admission_decisions_total";

/// Total cache hits.
///
/// Labels: `tier` ("l1" | "l2" | "l3").
pub const CACHE_HITS_TOTAL: &str = "heimdall_cache_hits_total";

/// Total cache misses. A degraded store read counts as a miss here as
/// well as in [`STORE_ERRORS_TOTAL`].
///
/// Labels: `tier` ("l1" | "l2" | "l3").
pub const CACHE_MISSES_TOTAL: &str = "heimdall_cache_misses_total";

/// Total upstream retry attempts (not counting the initial request).
///
/// Labels: `service`.
pub const RETRIES_TOTAL: &str = "heimdall_retries_total";

/// Total tokens consumed by generation.
///
/// Labels: `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "heimdall_tokens_total";

/// Shared-store operations that failed or timed out and were absorbed
/// (fail-open admission, unconditional cache miss).
///
/// Labels: `component` ("limiter" | "cache").
pub const STORE_ERRORS_TOTAL: &str = "heimdall_store_errors_total";

/// Cache entries purged by document-change invalidation.
///
/// Labels: `tier` ("l1" | "l3").
pub const INVALIDATIONS_TOTAL: &str = "heimdall_invalidations_total";

/// Invalidation passes that could not complete against the store.
///
/// No labels.
pub const INVALIDATION_FAILURES_TOTAL: &str = "heimdall_invalidation_failures_total";
