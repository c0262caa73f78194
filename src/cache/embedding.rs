//! L2 — query embedding cache.

use std::sync::Arc;
use std::time::Duration;

use crate::store::SharedStore;
use crate::types::Embedding;

use super::{content_hash, tier_get, tier_put};

/// Embedding cache keyed on normalized query text alone, 7 d TTL.
///
/// Not user-scoped: the embedding of a phrase does not depend on who
/// asks, so identical phrasing across users shares one computation.
/// Never explicitly invalidated — document changes don't alter what a
/// query means — entries only age out.
pub struct EmbeddingCache {
    store: Arc<dyn SharedStore>,
    ttl: Duration,
    store_timeout: Duration,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn SharedStore>, ttl: Duration, store_timeout: Duration) -> Self {
        Self {
            store,
            ttl,
            store_timeout,
        }
    }

    /// Cache key for a normalized query text.
    pub fn key(normalized_query: &str) -> String {
        format!("e:{}", content_hash(&[normalized_query.as_bytes()]))
    }

    pub async fn get(&self, key: &str) -> Option<Embedding> {
        tier_get(self.store.as_ref(), self.store_timeout, "l2", key).await
    }

    pub async fn put(&self, key: &str, embedding: &Embedding) {
        tier_put(
            self.store.as_ref(),
            self.store_timeout,
            "l2",
            key,
            embedding,
            self.ttl,
        )
        .await;
    }
}
