//! Tests for the three cache tiers — keying, TTL, scoping, prefix
//! invalidation, and degraded-store behaviour.

use std::sync::Arc;
use std::time::Duration;

use heimdall::cache::{CachedAnswer, ContextCache, EmbeddingCache, QueryResultCache};
use heimdall::store::MemoryStore;
use heimdall::types::{ChunkMatch, Embedding, RetrievalParams, Usage};

const STORE_TIMEOUT: Duration = Duration::from_secs(1);
const TTL: Duration = Duration::from_secs(60);

fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

fn answer(text: &str) -> CachedAnswer {
    CachedAnswer {
        answer: text.into(),
        sources: Vec::new(),
        usage: Usage::default(),
    }
}

fn embedding(seed: f32) -> Embedding {
    Embedding::new(vec![seed, seed + 1.0, seed + 2.0])
}

fn selection() -> Vec<ChunkMatch> {
    vec![
        ChunkMatch {
            chunk_id: "chunk-1".into(),
            score: 0.92,
        },
        ChunkMatch {
            chunk_id: "chunk-2".into(),
            score: 0.81,
        },
    ]
}

// ============================================================================
// L1 — answer cache
// ============================================================================

#[tokio::test]
async fn l1_miss_then_hit() {
    let cache = QueryResultCache::new(store(), TTL, STORE_TIMEOUT);
    let key = QueryResultCache::key("alice", "what is grace?", &RetrievalParams::default());

    assert!(cache.get(&key).await.is_none());
    cache.put(&key, &answer("grace is...")).await;

    let cached = cache.get(&key).await.unwrap();
    assert_eq!(cached.answer, "grace is...");
}

#[tokio::test]
async fn l1_key_depends_on_query_and_params() {
    let params = RetrievalParams::default();
    let base = QueryResultCache::key("alice", "what is grace?", &params);

    assert_ne!(
        base,
        QueryResultCache::key("alice", "what is grace", &params),
        "one-character difference must be a different key"
    );
    assert_ne!(
        base,
        QueryResultCache::key(
            "alice",
            "what is grace?",
            &RetrievalParams {
                top_k: 8,
                max_tokens: 512,
            }
        )
    );
}

#[tokio::test]
async fn l1_is_user_scoped() {
    let cache = QueryResultCache::new(store(), TTL, STORE_TIMEOUT);
    let params = RetrievalParams::default();
    let alice_key = QueryResultCache::key("alice", "what is grace?", &params);
    let bob_key = QueryResultCache::key("bob", "what is grace?", &params);

    assert_ne!(alice_key, bob_key);
    cache.put(&alice_key, &answer("alice's answer")).await;
    assert!(cache.get(&bob_key).await.is_none());
}

#[tokio::test]
async fn l1_ttl_expiry() {
    let cache = QueryResultCache::new(store(), Duration::from_millis(50), STORE_TIMEOUT);
    let key = QueryResultCache::key("alice", "q", &RetrievalParams::default());

    cache.put(&key, &answer("a")).await;
    assert!(cache.get(&key).await.is_some());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.get(&key).await.is_none());
}

#[tokio::test]
async fn l1_prefix_delete_isolates_users() {
    let cache = QueryResultCache::new(store(), TTL, STORE_TIMEOUT);
    let params = RetrievalParams::default();
    let alice_key = QueryResultCache::key("alice", "shared phrasing", &params);
    let bob_key = QueryResultCache::key("bob", "shared phrasing", &params);

    cache.put(&alice_key, &answer("a")).await;
    cache.put(&bob_key, &answer("b")).await;

    let removed = cache
        .delete_by_prefix(&QueryResultCache::user_prefix("alice"))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    assert!(cache.get(&alice_key).await.is_none());
    assert!(
        cache.get(&bob_key).await.is_some(),
        "identical query text for another user must survive"
    );
}

// ============================================================================
// L2 — embedding cache
// ============================================================================

#[tokio::test]
async fn l2_miss_then_hit() {
    let cache = EmbeddingCache::new(store(), TTL, STORE_TIMEOUT);
    let key = EmbeddingCache::key("what is grace?");

    assert!(cache.get(&key).await.is_none());
    cache.put(&key, &embedding(0.5)).await;

    let cached = cache.get(&key).await.unwrap();
    assert_eq!(cached.values, vec![0.5, 1.5, 2.5]);
    assert_eq!(cached.dimensions, 3);
}

#[tokio::test]
async fn l2_key_has_no_user_component() {
    // Same phrasing from any user resolves to the same entry.
    assert_eq!(
        EmbeddingCache::key("what is grace?"),
        EmbeddingCache::key("what is grace?")
    );
    assert_ne!(
        EmbeddingCache::key("what is grace?"),
        EmbeddingCache::key("what is mercy?")
    );
}

// ============================================================================
// L3 — context cache
// ============================================================================

#[tokio::test]
async fn l3_miss_then_hit_stores_selection_only() {
    let cache = ContextCache::new(store(), TTL, STORE_TIMEOUT);
    let key = ContextCache::key("alice", &embedding(0.1));

    assert!(cache.get(&key).await.is_none());
    cache.put(&key, &selection()).await;

    let cached = cache.get(&key).await.unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[0].chunk_id, "chunk-1");
    assert!(cached[0].score > cached[1].score);
}

#[tokio::test]
async fn l3_key_depends_on_user_and_embedding() {
    let e = embedding(0.1);
    let base = ContextCache::key("alice", &e);
    assert_ne!(base, ContextCache::key("bob", &e));
    assert_ne!(base, ContextCache::key("alice", &embedding(0.2)));
}

#[tokio::test]
async fn l3_prefix_delete_spares_other_users() {
    let cache = ContextCache::new(store(), TTL, STORE_TIMEOUT);
    let alice_key = ContextCache::key("alice", &embedding(0.1));
    let bob_key = ContextCache::key("bob", &embedding(0.1));

    cache.put(&alice_key, &selection()).await;
    cache.put(&bob_key, &selection()).await;

    cache
        .delete_by_prefix(&ContextCache::user_prefix("alice"))
        .await
        .unwrap();

    assert!(cache.get(&alice_key).await.is_none());
    assert!(cache.get(&bob_key).await.is_some());
}

// ============================================================================
// Tier independence
// ============================================================================

#[tokio::test]
async fn tiers_share_a_store_without_key_collisions() {
    let shared = store();
    let l1 = QueryResultCache::new(shared.clone(), TTL, STORE_TIMEOUT);
    let l2 = EmbeddingCache::new(shared.clone(), TTL, STORE_TIMEOUT);
    let l3 = ContextCache::new(shared, TTL, STORE_TIMEOUT);

    let l1_key = QueryResultCache::key("alice", "q", &RetrievalParams::default());
    let l2_key = EmbeddingCache::key("q");
    let l3_key = ContextCache::key("alice", &embedding(0.3));

    l1.put(&l1_key, &answer("a")).await;
    l2.put(&l2_key, &embedding(0.3)).await;
    l3.put(&l3_key, &selection()).await;

    // Purging alice's L1 leaves the other tiers alone.
    l1.delete_by_prefix(&QueryResultCache::user_prefix("alice"))
        .await
        .unwrap();
    assert!(l1.get(&l1_key).await.is_none());
    assert!(l2.get(&l2_key).await.is_some());
    assert!(l3.get(&l3_key).await.is_some());
}
