//! Configuration for admission control, caching, timeouts, and pricing.
//!
//! All config structs follow the same pattern: `Default` with the source
//! system's production values, chainable setters for overrides, serde
//! derives so they can be loaded from a config file by the embedding
//! service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-tier admission limits. A tier set to `None` is not enforced.
///
/// ```rust
/// # use heimdall::RateLimitConfig;
/// let limits = RateLimitConfig::new()
///     .per_minute(20)
///     .user_daily_cost_usd(10.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Per-user requests per minute.
    pub per_minute: Option<u32>,
    /// Per-user requests per hour.
    pub per_hour: Option<u32>,
    /// Per-user requests per day.
    pub per_day: Option<u32>,
    /// Requests in flight across all users.
    pub max_concurrent: Option<u32>,
    /// All-user requests per hour.
    pub global_hourly: Option<u32>,
    /// Per-user generation spend per UTC calendar day.
    pub user_daily_cost_usd: Option<f64>,
    /// All-user generation spend per UTC calendar day.
    pub global_daily_cost_usd: Option<f64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: Some(10),
            per_hour: Some(100),
            per_day: Some(500),
            max_concurrent: Some(32),
            global_hourly: Some(2_000),
            user_daily_cost_usd: Some(5.0),
            global_daily_cost_usd: Some(250.0),
        }
    }
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with every tier disabled, for composing tests.
    pub fn unlimited() -> Self {
        Self {
            per_minute: None,
            per_hour: None,
            per_day: None,
            max_concurrent: None,
            global_hourly: None,
            user_daily_cost_usd: None,
            global_daily_cost_usd: None,
        }
    }

    pub fn per_minute(mut self, limit: u32) -> Self {
        self.per_minute = Some(limit);
        self
    }

    pub fn per_hour(mut self, limit: u32) -> Self {
        self.per_hour = Some(limit);
        self
    }

    pub fn per_day(mut self, limit: u32) -> Self {
        self.per_day = Some(limit);
        self
    }

    pub fn max_concurrent(mut self, limit: u32) -> Self {
        self.max_concurrent = Some(limit);
        self
    }

    pub fn global_hourly(mut self, limit: u32) -> Self {
        self.global_hourly = Some(limit);
        self
    }

    pub fn user_daily_cost_usd(mut self, limit: f64) -> Self {
        self.user_daily_cost_usd = Some(limit);
        self
    }

    pub fn global_daily_cost_usd(mut self, limit: f64) -> Self {
        self.global_daily_cost_usd = Some(limit);
        self
    }
}

/// Time-to-live per cache tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// L1 answer cache. Default: 24 hours.
    #[serde(with = "duration_secs")]
    pub query_ttl: Duration,
    /// L2 embedding cache. Default: 7 days.
    #[serde(with = "duration_secs")]
    pub embedding_ttl: Duration,
    /// L3 context-selection cache. Default: 1 hour.
    #[serde(with = "duration_secs")]
    pub context_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            query_ttl: Duration::from_secs(24 * 60 * 60),
            embedding_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            context_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_ttl(mut self, ttl: Duration) -> Self {
        self.query_ttl = ttl;
        self
    }

    pub fn embedding_ttl(mut self, ttl: Duration) -> Self {
        self.embedding_ttl = ttl;
        self
    }

    pub fn context_ttl(mut self, ttl: Duration) -> Self {
        self.context_ttl = ttl;
        self
    }
}

/// Deadlines for every call that leaves the process.
///
/// A store deadline is absorbed (fail-open / cache miss); an upstream
/// deadline surfaces as
/// [`UpstreamTimeout`](crate::HeimdallError::UpstreamTimeout).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(with = "duration_secs")]
    pub store: Duration,
    #[serde(with = "duration_secs")]
    pub embedding: Duration,
    #[serde(with = "duration_secs")]
    pub retrieval: Duration,
    #[serde(with = "duration_secs")]
    pub generation: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(2),
            embedding: Duration::from_secs(10),
            retrieval: Duration::from_secs(10),
            generation: Duration::from_secs(60),
        }
    }
}

impl TimeoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, timeout: Duration) -> Self {
        self.store = timeout;
        self
    }

    pub fn embedding(mut self, timeout: Duration) -> Self {
        self.embedding = timeout;
        self
    }

    pub fn retrieval(mut self, timeout: Duration) -> Self {
        self.retrieval = timeout;
        self
    }

    pub fn generation(mut self, timeout: Duration) -> Self {
        self.generation = timeout;
        self
    }
}

/// Dollar rates applied to generation token usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub prompt_usd_per_1k: f64,
    pub completion_usd_per_1k: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            prompt_usd_per_1k: 0.0005,
            completion_usd_per_1k: 0.0015,
        }
    }
}

impl PricingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt_usd_per_1k(mut self, rate: f64) -> Self {
        self.prompt_usd_per_1k = rate;
        self
    }

    pub fn completion_usd_per_1k(mut self, rate: f64) -> Self {
        self.completion_usd_per_1k = rate;
        self
    }

    /// Dollar cost of a generation call given its reported usage.
    pub fn cost_of(&self, usage: &crate::types::Usage) -> f64 {
        f64::from(usage.prompt_tokens) / 1_000.0 * self.prompt_usd_per_1k
            + f64::from(usage.completion_tokens) / 1_000.0 * self.completion_usd_per_1k
    }
}

/// Bounds on prompt assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Retrieved chunks are appended in rank order until the next chunk
    /// would push the assembled context past this many characters.
    pub max_context_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 12_000,
        }
    }
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.max_context_chars = chars;
        self
    }
}

/// Serialize `Duration` as whole seconds in config files.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
