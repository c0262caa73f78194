//! Cache invalidation on document change.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{ContextCache, QueryResultCache};
use crate::telemetry;

/// Reacts to "document changed" notifications from the document
/// collaborator and purges the affected user's stale cache entries.
///
/// A create/update/delete invalidates that user's L1 answers (built on
/// the old corpus) and L3 selections (ranked against the old chunks).
/// L2 is deliberately untouched — query embeddings don't depend on the
/// user's documents — so the hook doesn't even hold a reference to it.
///
/// Runs synchronously: `on_document_changed` returns only after both
/// purges complete, so a write followed by a query never sees
/// pre-change cache state. The hook only ever deletes entries, never
/// creates them.
pub struct InvalidationHook {
    l1: Arc<QueryResultCache>,
    l3: Arc<ContextCache>,
}

impl InvalidationHook {
    pub fn new(l1: Arc<QueryResultCache>, l3: Arc<ContextCache>) -> Self {
        Self { l1, l3 }
    }

    /// Purge every L1 and L3 entry belonging to `user_id`.
    ///
    /// Store failures are logged and counted, not returned: the document
    /// write that triggered this has already happened, and stale entries
    /// age out by TTL in the worst case.
    pub async fn on_document_changed(&self, user_id: &str) {
        match self
            .l1
            .delete_by_prefix(&QueryResultCache::user_prefix(user_id))
            .await
        {
            Ok(removed) => {
                metrics::counter!(telemetry::INVALIDATIONS_TOTAL, "tier" => "l1").increment(removed);
                debug!(user_id, removed, "purged answer cache");
            }
            Err(e) => {
                metrics::counter!(telemetry::INVALIDATION_FAILURES_TOTAL).increment(1);
                warn!(user_id, error = %e, "answer cache purge failed; entries expire by TTL");
            }
        }

        match self
            .l3
            .delete_by_prefix(&ContextCache::user_prefix(user_id))
            .await
        {
            Ok(removed) => {
                metrics::counter!(telemetry::INVALIDATIONS_TOTAL, "tier" => "l3").increment(removed);
                debug!(user_id, removed, "purged context cache");
            }
            Err(e) => {
                metrics::counter!(telemetry::INVALIDATION_FAILURES_TOTAL).increment(1);
                warn!(user_id, error = %e, "context cache purge failed; entries expire by TTL");
            }
        }
    }
}
