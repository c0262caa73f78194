//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and
//! assert on emitted metrics without needing a real exporter.

use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use heimdall::providers::{EmbeddingProvider, GenerationProvider, RetrievalProvider};
use heimdall::telemetry;
use heimdall::types::{Chunk, ChunkMatch, Embedding, GenerationOutput, QueryRequest, Usage};
use heimdall::{Heimdall, PipelineOrchestrator, RateLimitConfig, Result};

// ============================================================================
// Mock providers
// ============================================================================

struct StaticEmbedding;

#[async_trait]
impl EmbeddingProvider for StaticEmbedding {
    fn name(&self) -> &str {
        "static-embed"
    }

    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Ok(Embedding::new(vec![0.1, 0.2]))
    }
}

struct StaticRetrieval;

#[async_trait]
impl RetrievalProvider for StaticRetrieval {
    fn name(&self) -> &str {
        "static-retrieval"
    }

    async fn search(
        &self,
        _user_id: &str,
        _vector: &Embedding,
        _top_k: usize,
    ) -> Result<Vec<ChunkMatch>> {
        Ok(vec![ChunkMatch {
            chunk_id: "c1".into(),
            score: 0.9,
        }])
    }

    async fn fetch_chunks(&self, _user_id: &str, chunk_ids: &[String]) -> Result<Vec<Chunk>> {
        Ok(chunk_ids
            .iter()
            .map(|id| Chunk {
                id: id.clone(),
                text: "body".into(),
                source: None,
            })
            .collect())
    }
}

struct StaticGeneration;

#[async_trait]
impl GenerationProvider for StaticGeneration {
    fn name(&self) -> &str {
        "static-generation"
    }

    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<GenerationOutput> {
        Ok(GenerationOutput {
            text: "answer".into(),
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            },
        })
    }
}

fn pipeline(limits: RateLimitConfig) -> PipelineOrchestrator {
    Heimdall::builder()
        .embedding_provider(Arc::new(StaticEmbedding))
        .retrieval_provider(Arc::new(StaticRetrieval))
        .generation_provider(Arc::new(StaticGeneration))
        .rate_limits(limits)
        .build()
        .unwrap()
}

// ============================================================================
// Snapshot helpers
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

/// Sum all counter values matching a given metric name (any labels).
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Sum counters matching a metric name and a specific label pair.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, v)| match v {
            DebugValue::Counter(n) => *n,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread
/// runtime. `block_in_place` ensures the sync `with_local_recorder`
/// closure stays on the current thread while `block_on` drives the inner
/// async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn miss_then_hit_records_per_tier_cache_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let pipeline = pipeline(RateLimitConfig::unlimited());
                let request = QueryRequest::new("alice", "What is grace?");
                pipeline.execute(&request).await.unwrap();
                pipeline.execute(&request).await.unwrap();
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_MISSES_TOTAL, "tier", "l1"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_HITS_TOTAL, "tier", "l1"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_MISSES_TOTAL, "tier", "l2"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_MISSES_TOTAL, "tier", "l3"),
        1
    );

    assert_eq!(
        counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, "status", "ok"),
        2
    );
    assert!(has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS));
    assert!(has_histogram(&snapshot, telemetry::REQUEST_COST_USD));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn admission_decisions_are_labelled() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let pipeline = pipeline(RateLimitConfig::unlimited().per_minute(1));
                pipeline
                    .execute(&QueryRequest::new("alice", "first"))
                    .await
                    .unwrap();
                let _ = pipeline.execute(&QueryRequest::new("alice", "second")).await;
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::ADMISSION_DECISIONS_TOTAL,
            "decision",
            "allowed"
        ),
        1
    );
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::ADMISSION_DECISIONS_TOTAL,
            "decision",
            "denied"
        ),
        1
    );
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::ADMISSION_DECISIONS_TOTAL,
            "tier",
            "per_minute"
        ),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn token_usage_is_counted_per_direction() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let pipeline = pipeline(RateLimitConfig::unlimited());
                pipeline
                    .execute(&QueryRequest::new("alice", "What is grace?"))
                    .await
                    .unwrap();
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TOKENS_TOTAL, "direction", "prompt"),
        100
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TOKENS_TOTAL, "direction", "completion"),
        20
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let pipeline = pipeline(RateLimitConfig::default());
    let _ = pipeline
        .execute(&QueryRequest::new("alice", "What is grace?"))
        .await
        .unwrap();
}
