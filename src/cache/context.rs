//! L3 — context selection cache.

use std::sync::Arc;
use std::time::Duration;

use crate::store::SharedStore;
use crate::types::{ChunkMatch, Embedding};

use super::{content_hash, tier_get, tier_put};

/// Ranked-selection cache keyed on (user, query embedding), 1 h TTL.
///
/// Holds only `(chunk id, score)` lists — the decision of *which* chunks
/// are relevant. Chunk bodies are fetched fresh on every request, hit or
/// miss, because content changes independently and more frequently than
/// the selection. User-scoped, purged on document change.
pub struct ContextCache {
    store: Arc<dyn SharedStore>,
    ttl: Duration,
    store_timeout: Duration,
}

impl ContextCache {
    pub fn new(store: Arc<dyn SharedStore>, ttl: Duration, store_timeout: Duration) -> Self {
        Self {
            store,
            ttl,
            store_timeout,
        }
    }

    /// Cache key for a (user, query embedding) pair.
    pub fn key(user_id: &str, embedding: &Embedding) -> String {
        let hash = content_hash(&[&embedding.to_bytes()]);
        format!("{}{hash}", Self::user_prefix(user_id))
    }

    /// Key prefix owning every L3 entry of one user.
    pub fn user_prefix(user_id: &str) -> String {
        format!("c:{user_id}:")
    }

    pub async fn get(&self, key: &str) -> Option<Vec<ChunkMatch>> {
        tier_get(self.store.as_ref(), self.store_timeout, "l3", key).await
    }

    pub async fn put(&self, key: &str, selection: &[ChunkMatch]) {
        tier_put(
            self.store.as_ref(),
            self.store_timeout,
            "l3",
            key,
            selection,
            self.ttl,
        )
        .await;
    }

    /// Remove every entry under `prefix`.
    pub async fn delete_by_prefix(&self, prefix: &str) -> crate::store::StoreResult<u64> {
        super::bounded(self.store_timeout, self.store.delete_prefix(prefix)).await
    }
}
