//! L1 — complete answer cache.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::SharedStore;
use crate::types::{RetrievalParams, SourceRef, Usage};

use super::{content_hash, tier_get, tier_put};

/// The answer payload persisted on a successful generation: everything
/// needed to serve a repeat query without touching the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub usage: Usage,
}

/// Exact-match answer cache, user-scoped, 24 h TTL.
///
/// Keys hash (normalized query, retrieval parameters) under a
/// `q:{user_id}:` prefix so a user's entries can be purged in one
/// prefix deletion. Exact-match is a stated design limit: two queries
/// differing by one character are different keys.
pub struct QueryResultCache {
    store: Arc<dyn SharedStore>,
    ttl: Duration,
    store_timeout: Duration,
}

impl QueryResultCache {
    pub fn new(store: Arc<dyn SharedStore>, ttl: Duration, store_timeout: Duration) -> Self {
        Self {
            store,
            ttl,
            store_timeout,
        }
    }

    /// Cache key for a (user, normalized query, params) triple.
    pub fn key(user_id: &str, normalized_query: &str, params: &RetrievalParams) -> String {
        let hash = content_hash(&[
            normalized_query.as_bytes(),
            &(params.top_k as u64).to_le_bytes(),
            &params.max_tokens.to_le_bytes(),
        ]);
        format!("{}{hash}", Self::user_prefix(user_id))
    }

    /// Key prefix owning every L1 entry of one user.
    pub fn user_prefix(user_id: &str) -> String {
        format!("q:{user_id}:")
    }

    pub async fn get(&self, key: &str) -> Option<CachedAnswer> {
        tier_get(self.store.as_ref(), self.store_timeout, "l1", key).await
    }

    pub async fn put(&self, key: &str, answer: &CachedAnswer) {
        tier_put(
            self.store.as_ref(),
            self.store_timeout,
            "l1",
            key,
            answer,
            self.ttl,
        )
        .await;
    }

    /// Remove every entry under `prefix`. Returns entries removed, or an
    /// error the caller may surface (the invalidation hook logs it).
    pub async fn delete_by_prefix(&self, prefix: &str) -> crate::store::StoreResult<u64> {
        super::bounded(self.store_timeout, self.store.delete_prefix(prefix)).await
    }
}
