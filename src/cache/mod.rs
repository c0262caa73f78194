//! Caching subsystem.
//!
//! Three independent caches, each with its own key shape, TTL, and scope:
//!
//! - [`QueryResultCache`] (L1) — complete answers, keyed on (user,
//!   normalized query, retrieval parameters). Exact-match only, 24 h,
//!   user-scoped.
//!
//! - [`EmbeddingCache`] (L2) — query embeddings, keyed on normalized
//!   query text alone. Deliberately **not** user-scoped: identical
//!   phrasing across users shares one embedding computation. 7 d, only
//!   ever TTL-expired.
//!
//! - [`ContextCache`] (L3) — ranked chunk selections, keyed on (user,
//!   query embedding). Stores chunk references and scores, never chunk
//!   bodies — bodies are re-fetched fresh on every request because
//!   content changes more often than the relevance decision. 1 h,
//!   user-scoped.
//!
//! Entries are created only as a side effect of a miss followed by a
//! successful expensive computation, never speculatively. L1 and L3
//! entries for a user are purged by
//! [`InvalidationHook`](crate::invalidation::InvalidationHook) when that
//! user's documents change.
//!
//! All tiers treat store errors and store timeouts as unconditional
//! misses (get) or silent no-ops (put) — a degraded store slows the
//! pipeline down, it never fails a request.
//!
//! Writes are last-writer-wins with no cross-key transactions. Two
//! requests missing the same key concurrently may both compute and both
//! write; the results are idempotent, so no per-key locking is done.

pub mod context;
pub mod embedding;
pub mod query;

pub use context::ContextCache;
pub use embedding::EmbeddingCache;
pub use query::{CachedAnswer, QueryResultCache};

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::store::{SharedStore, StoreResult};
use crate::telemetry;

/// Stable content hash for cache keys: SHA-256, hex, truncated to 128
/// bits. Keys live in a shared store, so the hash must be identical
/// across processes and releases — no process-seeded hashers.
pub(crate) fn content_hash(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for byte in &digest[..16] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Shared get path: bounded store read, JSON decode, hit/miss metrics.
/// Any failure — store error, timeout, undecodable bytes — is a miss.
pub(crate) async fn tier_get<T: DeserializeOwned>(
    store: &dyn SharedStore,
    store_timeout: Duration,
    tier: &'static str,
    key: &str,
) -> Option<T> {
    let bytes = match bounded(store_timeout, store.kv_get(key)).await {
        Ok(found) => found,
        Err(e) => {
            metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "component" => "cache").increment(1);
            warn!(tier, key, error = %e, "cache read degraded to miss");
            None
        }
    };
    let value = bytes.and_then(|b| match serde_json::from_slice(&b) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(tier, key, error = %e, "undecodable cache entry treated as miss");
            None
        }
    });
    match value {
        Some(v) => {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => tier).increment(1);
            Some(v)
        }
        None => {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "tier" => tier).increment(1);
            None
        }
    }
}

/// Shared put path: JSON encode, bounded store write. Failures are
/// logged and dropped — the response the value came from is already
/// computed.
pub(crate) async fn tier_put<T: Serialize + ?Sized>(
    store: &dyn SharedStore,
    store_timeout: Duration,
    tier: &'static str,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    let bytes = match serde_json::to_vec(value) {
        Ok(b) => b,
        Err(e) => {
            warn!(tier, key, error = %e, "cache value failed to encode");
            return;
        }
    };
    if let Err(e) = bounded(store_timeout, store.kv_put(key, bytes, ttl)).await {
        metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "component" => "cache").increment(1);
        warn!(tier, key, error = %e, "cache write dropped");
    }
}

pub(crate) async fn bounded<T>(
    store_timeout: Duration,
    fut: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    match tokio::time::timeout(store_timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(crate::store::StoreError::Timeout(store_timeout)),
    }
}
