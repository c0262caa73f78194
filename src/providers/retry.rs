//! Retry configuration and the shared retry helper.
//!
//! Only idempotent upstream calls go through [`with_retry`] by default —
//! the orchestrator passes [`HeimdallError::is_transient`] as the
//! predicate, which admits embedding and retrieval failures and rejects
//! everything from the billable generation service. Opt-in generation
//! retry supplies its own predicate (failures yes, timeouts never).

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::UpstreamService;
use crate::telemetry;
use crate::{HeimdallError, Result};

/// Configuration for retry behaviour on transient upstream errors.
///
/// Uses exponential backoff. Defaults to a single internal retry
/// (`max_attempts` = 2, counting the initial request).
///
/// ```rust
/// # use heimdall::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(3)
///     .initial_delay(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 2.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 200ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 5s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Exponential backoff: `initial_delay * 2^attempt`, capped at
    /// `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

/// Execute an upstream call with retry.
///
/// Retries errors accepted by `should_retry` up to `config.max_attempts`,
/// with exponential backoff. Rejected errors return immediately.
pub(crate) async fn with_retry<F, Fut, T, P>(
    config: &RetryConfig,
    service: UpstreamService,
    should_retry: P,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&HeimdallError) -> bool,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts.max(1) {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if should_retry(&e) => {
                if attempt + 1 < config.max_attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL, "service" => service.as_str())
                        .increment(1);
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        service = service.as_str(),
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient upstream error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or(HeimdallError::UpstreamUnavailable {
        service,
        reason: "no attempts made".into(),
    }))
}
