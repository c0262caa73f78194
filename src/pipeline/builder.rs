//! Builder for configuring pipeline instances.

use std::sync::Arc;

use crate::cache::{ContextCache, EmbeddingCache, QueryResultCache};
use crate::config::{CacheConfig, ContextConfig, PricingConfig, RateLimitConfig, TimeoutConfig};
use crate::limiter::RateLimiter;
use crate::providers::retry::RetryConfig;
use crate::providers::traits::{EmbeddingProvider, GenerationProvider, RetrievalProvider};
use crate::store::{MemoryStore, SharedStore};
use crate::{HeimdallError, Result};

use super::PipelineOrchestrator;

/// Main entry point for creating pipeline instances.
pub struct Heimdall;

impl Heimdall {
    /// Create a new builder for configuring the pipeline.
    pub fn builder() -> HeimdallBuilder {
        HeimdallBuilder::new()
    }
}

/// Builder for configuring pipeline instances.
///
/// The three providers are required; everything else has production
/// defaults. Without an explicit [`store`](Self::store), a fresh
/// single-process [`MemoryStore`] is used — fine for one instance,
/// wrong for a fleet.
pub struct HeimdallBuilder {
    store: Option<Arc<dyn SharedStore>>,
    embedding: Option<Arc<dyn EmbeddingProvider>>,
    retrieval: Option<Arc<dyn RetrievalProvider>>,
    generation: Option<Arc<dyn GenerationProvider>>,
    limits: RateLimitConfig,
    cache: CacheConfig,
    timeouts: TimeoutConfig,
    pricing: PricingConfig,
    context: ContextConfig,
    retry: RetryConfig,
    retry_generation: bool,
}

impl HeimdallBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            embedding: None,
            retrieval: None,
            generation: None,
            limits: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            timeouts: TimeoutConfig::default(),
            pricing: PricingConfig::default(),
            context: ContextConfig::default(),
            retry: RetryConfig::default(),
            retry_generation: false,
        }
    }

    /// Use a specific shared store (e.g. one shared across instances).
    pub fn store(mut self, store: Arc<dyn SharedStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the embedding service client.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding = Some(provider);
        self
    }

    /// Set the similarity-search service client.
    pub fn retrieval_provider(mut self, provider: Arc<dyn RetrievalProvider>) -> Self {
        self.retrieval = Some(provider);
        self
    }

    /// Set the generation service client.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation = Some(provider);
        self
    }

    /// Override admission limits.
    pub fn rate_limits(mut self, limits: RateLimitConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Override cache TTLs.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Override call deadlines.
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Override generation pricing.
    pub fn pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    /// Override prompt-assembly bounds.
    pub fn context(mut self, context: ContextConfig) -> Self {
        self.context = context;
        self
    }

    /// Override retry behaviour for idempotent upstream calls.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Allow retrying failed generation calls.
    ///
    /// Off by default: generation is billable, and a retried call can be
    /// a duplicate charge. Enable only when the generation service
    /// deduplicates requests. Timeouts are never retried regardless.
    pub fn retry_generation(mut self, enabled: bool) -> Self {
        self.retry_generation = enabled;
        self
    }

    /// Build the pipeline.
    ///
    /// Fails with [`HeimdallError::Configuration`] if any of the three
    /// providers is missing.
    pub fn build(self) -> Result<PipelineOrchestrator> {
        let embedding = self
            .embedding
            .ok_or_else(|| HeimdallError::Configuration("no embedding provider".into()))?;
        let retrieval = self
            .retrieval
            .ok_or_else(|| HeimdallError::Configuration("no retrieval provider".into()))?;
        let generation = self
            .generation
            .ok_or_else(|| HeimdallError::Configuration("no generation provider".into()))?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn SharedStore>);
        let store_timeout = self.timeouts.store;

        Ok(PipelineOrchestrator {
            limiter: RateLimiter::new(store.clone(), self.limits, store_timeout),
            l1: Arc::new(QueryResultCache::new(
                store.clone(),
                self.cache.query_ttl,
                store_timeout,
            )),
            l2: EmbeddingCache::new(store.clone(), self.cache.embedding_ttl, store_timeout),
            l3: Arc::new(ContextCache::new(
                store.clone(),
                self.cache.context_ttl,
                store_timeout,
            )),
            embedding,
            retrieval,
            generation,
            timeouts: self.timeouts,
            pricing: self.pricing,
            context: self.context,
            retry: self.retry,
            retry_generation: self.retry_generation,
        })
    }
}

impl Default for HeimdallBuilder {
    fn default() -> Self {
        Self::new()
    }
}
