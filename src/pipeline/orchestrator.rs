//! The end-to-end request flow.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use crate::cache::{CachedAnswer, ContextCache, EmbeddingCache, QueryResultCache};
use crate::config::{ContextConfig, PricingConfig, TimeoutConfig};
use crate::error::UpstreamService;
use crate::invalidation::InvalidationHook;
use crate::limiter::{Decision, RateLimiter};
use crate::providers::retry::{RetryConfig, with_retry};
use crate::providers::traits::{EmbeddingProvider, GenerationProvider, RetrievalProvider};
use crate::telemetry;
use crate::types::{
    Chunk, ChunkMatch, Embedding, GenerationOutput, QueryRequest, QueryResponse, RateLimitStatus,
    SourceRef, TierOutcome, Usage,
};
use crate::types::response::CacheProvenance;
use crate::{HeimdallError, Result};

use super::context::assemble_prompt;

/// Composes the rate limiter and the three cache tiers into the
/// admission → lookup → compute → store → finalize flow, calling the
/// external services only on cache misses.
///
/// Cheap to share behind an `Arc`; every call to
/// [`execute`](Self::execute) is an independent concurrent unit of work.
pub struct PipelineOrchestrator {
    pub(super) limiter: RateLimiter,
    pub(super) l1: Arc<QueryResultCache>,
    pub(super) l2: EmbeddingCache,
    pub(super) l3: Arc<ContextCache>,
    pub(super) embedding: Arc<dyn EmbeddingProvider>,
    pub(super) retrieval: Arc<dyn RetrievalProvider>,
    pub(super) generation: Arc<dyn GenerationProvider>,
    pub(super) timeouts: TimeoutConfig,
    pub(super) pricing: PricingConfig,
    pub(super) context: ContextConfig,
    pub(super) retry: RetryConfig,
    pub(super) retry_generation: bool,
}

impl PipelineOrchestrator {
    /// Run one query through the pipeline.
    ///
    /// Validation happens before any admission or cache state is
    /// touched. Denials and upstream failures come back as error values;
    /// everything store-related is absorbed (fail-open admission,
    /// unconditional cache miss).
    #[instrument(skip(self, request), fields(user = %request.user_id))]
    pub async fn execute(&self, request: &QueryRequest) -> Result<QueryResponse> {
        request.validate()?;
        let started = Instant::now();

        let cost_hint =
            f64::from(request.params.max_tokens) / 1_000.0 * self.pricing.completion_usd_per_1k;
        let (status, slot) = match self.limiter.admit(&request.user_id, cost_hint).await {
            Decision::Denied { tier, retry_after } => {
                metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "denied").increment(1);
                return Err(HeimdallError::AdmissionDenied { tier, retry_after });
            }
            Decision::Allowed { slot } => (RateLimitStatus::Allowed, slot),
            Decision::DegradedAllowed { slot } => (RateLimitStatus::Degraded, slot),
        };

        // The slot is held across every path below; explicit release on
        // the two return paths, guard drop on cancellation.
        let result = self.run_admitted(request, status, started).await;
        if let Some(guard) = slot {
            guard.release().await;
        }

        match &result {
            Ok(response) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "ok").increment(1);
                let cached = response.cache_provenance.l1.is_hit();
                metrics::histogram!(
                    telemetry::REQUEST_DURATION_SECONDS,
                    "cached" => if cached { "true" } else { "false" },
                )
                .record(started.elapsed().as_secs_f64());
                metrics::histogram!(telemetry::REQUEST_COST_USD).record(response.cost_usd);
            }
            Err(e) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL, "status" => "error").increment(1);
                debug!(error = %e, "pipeline request failed");
            }
        }
        result
    }

    /// An invalidation hook wired to this pipeline's L1 and L3 tiers,
    /// for the document collaborator to call on create/update/delete.
    pub fn invalidation_hook(&self) -> InvalidationHook {
        InvalidationHook::new(self.l1.clone(), self.l3.clone())
    }

    /// Requests currently holding a concurrency slot.
    pub async fn in_flight(&self) -> u32 {
        self.limiter.in_flight().await.unwrap_or(0)
    }

    // ========================================================================
    // State machine (post-admission)
    // ========================================================================

    async fn run_admitted(
        &self,
        request: &QueryRequest,
        status: RateLimitStatus,
        started: Instant,
    ) -> Result<QueryResponse> {
        let mut provenance = CacheProvenance::default();
        let normalized = request.normalized_query();

        // LOOKUP_L1
        let l1_key = QueryResultCache::key(&request.user_id, &normalized, &request.params);
        if let Some(cached) = self.l1.get(&l1_key).await {
            provenance.l1 = TierOutcome::Hit;
            debug!(elapsed_ms = started.elapsed().as_millis() as u64, "answered from L1");
            return Ok(QueryResponse {
                answer: cached.answer,
                sources: cached.sources,
                cache_provenance: provenance,
                cost_usd: 0.0,
                rate_limit_status: status,
                usage: Some(cached.usage),
            });
        }

        // LOOKUP_L2, embed on miss
        let l2_key = EmbeddingCache::key(&normalized);
        let embedding = match self.l2.get(&l2_key).await {
            Some(found) => {
                provenance.l2 = TierOutcome::Hit;
                found
            }
            None => {
                let computed = self.embed(&normalized).await?;
                self.l2.put(&l2_key, &computed).await;
                computed
            }
        };

        // LOOKUP_L3, search on miss
        let l3_key = ContextCache::key(&request.user_id, &embedding);
        let selection = match self.l3.get(&l3_key).await {
            Some(found) => {
                provenance.l3 = TierOutcome::Hit;
                found
            }
            None => {
                let computed = self
                    .search(&request.user_id, &embedding, request.params.top_k)
                    .await?;
                self.l3.put(&l3_key, &computed).await;
                computed
            }
        };

        // Chunk bodies are always fetched fresh, even on an L3 hit.
        let chunk_ids: Vec<String> = selection.iter().map(|m| m.chunk_id.clone()).collect();
        let chunks = self.fetch_chunks(&request.user_id, &chunk_ids).await?;

        // GENERATE — never reached with a partial L1 write below; the
        // store happens only after this succeeds.
        let prompt = assemble_prompt(
            request.query_text.trim(),
            &chunks,
            self.context.max_context_chars,
        );
        let output = self.generate(&prompt, request.params.max_tokens).await?;
        let cost = self.pricing.cost_of(&output.usage);
        record_tokens(&output.usage);

        let sources = source_refs(&selection, &chunks);

        // STORE_L1
        self.l1
            .put(
                &l1_key,
                &CachedAnswer {
                    answer: output.text.clone(),
                    sources: sources.clone(),
                    usage: output.usage.clone(),
                },
            )
            .await;

        // FINALIZE
        self.limiter.record_cost(&request.user_id, cost).await;
        debug!(
            cost_usd = cost,
            elapsed_ms = started.elapsed().as_millis() as u64,
            l2_hit = provenance.l2.is_hit(),
            l3_hit = provenance.l3.is_hit(),
            "answer generated"
        );
        Ok(QueryResponse {
            answer: output.text,
            sources,
            cache_provenance: provenance,
            cost_usd: cost,
            rate_limit_status: status,
            usage: Some(output.usage),
        })
    }

    // ========================================================================
    // Upstream calls: bounded deadlines, retry per service policy
    // ========================================================================

    async fn embed(&self, text: &str) -> Result<Embedding> {
        with_retry(
            &self.retry,
            UpstreamService::Embedding,
            HeimdallError::is_transient,
            || {
                deadline(
                    self.timeouts.embedding,
                    UpstreamService::Embedding,
                    self.embedding.embed(text),
                )
            },
        )
        .await
    }

    async fn search(
        &self,
        user_id: &str,
        vector: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ChunkMatch>> {
        with_retry(
            &self.retry,
            UpstreamService::Retrieval,
            HeimdallError::is_transient,
            || {
                deadline(
                    self.timeouts.retrieval,
                    UpstreamService::Retrieval,
                    self.retrieval.search(user_id, vector, top_k),
                )
            },
        )
        .await
    }

    async fn fetch_chunks(&self, user_id: &str, chunk_ids: &[String]) -> Result<Vec<Chunk>> {
        with_retry(
            &self.retry,
            UpstreamService::Retrieval,
            HeimdallError::is_transient,
            || {
                deadline(
                    self.timeouts.retrieval,
                    UpstreamService::Retrieval,
                    self.retrieval.fetch_chunks(user_id, chunk_ids),
                )
            },
        )
        .await
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<GenerationOutput> {
        if self.retry_generation {
            // Opt-in only, and even then a timeout is never replayed —
            // the first attempt may have been billed.
            with_retry(
                &self.retry,
                UpstreamService::Generation,
                |e| {
                    matches!(
                        e,
                        HeimdallError::UpstreamUnavailable {
                            service: UpstreamService::Generation,
                            ..
                        }
                    )
                },
                || {
                    deadline(
                        self.timeouts.generation,
                        UpstreamService::Generation,
                        self.generation.generate(prompt, max_tokens),
                    )
                },
            )
            .await
        } else {
            deadline(
                self.timeouts.generation,
                UpstreamService::Generation,
                self.generation.generate(prompt, max_tokens),
            )
            .await
        }
    }
}

/// Bound an upstream call to its configured deadline.
async fn deadline<T>(
    timeout: Duration,
    service: UpstreamService,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(HeimdallError::UpstreamTimeout {
            service,
            elapsed: timeout,
        }),
    }
}

fn record_tokens(usage: &Usage) {
    metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "prompt")
        .increment(u64::from(usage.prompt_tokens));
    metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "completion")
        .increment(u64::from(usage.completion_tokens));
}

/// Join the ranked selection with fetched bodies to produce the
/// client-facing source list. A chunk deleted between search and fetch
/// simply drops out of the sources.
fn source_refs(selection: &[ChunkMatch], chunks: &[Chunk]) -> Vec<SourceRef> {
    selection
        .iter()
        .filter_map(|m| {
            chunks
                .iter()
                .find(|c| c.id == m.chunk_id)
                .map(|c| SourceRef {
                    chunk_id: m.chunk_id.clone(),
                    score: m.score,
                    source: c.source.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str) -> Chunk {
        Chunk {
            id: id.into(),
            text: "body".into(),
            source: Some(format!("doc-{id}")),
        }
    }

    #[test]
    fn source_refs_preserve_rank_order() {
        let selection = vec![
            ChunkMatch {
                chunk_id: "b".into(),
                score: 0.9,
            },
            ChunkMatch {
                chunk_id: "a".into(),
                score: 0.7,
            },
        ];
        let chunks = vec![chunk("a"), chunk("b")];
        let refs = source_refs(&selection, &chunks);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].chunk_id, "b");
        assert_eq!(refs[1].chunk_id, "a");
        assert_eq!(refs[0].source.as_deref(), Some("doc-b"));
    }

    #[test]
    fn source_refs_drop_vanished_chunks() {
        let selection = vec![ChunkMatch {
            chunk_id: "gone".into(),
            score: 0.5,
        }];
        let refs = source_refs(&selection, &[chunk("a")]);
        assert!(refs.is_empty());
    }
}
