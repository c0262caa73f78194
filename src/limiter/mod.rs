//! Sliding-window + cost-ledger admission control.
//!
//! Seven tiers, evaluated in a fixed order: per-minute → per-hour →
//! per-day (per user), global-concurrent, global-hourly, per-user daily
//! cost, global daily cost. The first violated tier determines the
//! [`Decision::Denied`] reason and its `retry_after`.
//!
//! Window tiers use a sliding-window log: a timestamped event set per
//! (subject, window) in the shared store, checked and recorded as one
//! atomic store operation. Cost tiers read a running per-UTC-day ledger.
//!
//! # Post-hoc cost accounting
//!
//! Actual request cost is only known after generation completes, so
//! [`RateLimiter::record_cost`] runs at the end of a request and affects
//! only future admissions for that subject/day. A single unusually
//! expensive request can therefore exceed a daily budget before the next
//! request is blocked. This asymmetry is a documented property of the
//! design, not a defect.
//!
//! # Failure policy
//!
//! The shared store being unreachable yields
//! [`Decision::DegradedAllowed`] (fail-open) rather than blocking
//! traffic, counted separately so operators can tell fallback from
//! normal admission.

mod decision;
mod slot;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{Timelike, Utc};
use tracing::{debug, warn};

pub use decision::{Decision, LimitTier};
pub use slot::SlotGuard;

use crate::config::RateLimitConfig;
use crate::store::{SharedStore, StoreError, StoreResult, WindowOutcome};
use crate::telemetry;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Ledger entries outlive their calendar day slightly; reads always go
/// through a date-stamped key, so stale entries are unreachable.
const COST_TTL: Duration = Duration::from_secs(25 * 60 * 60);

/// Retry hint for the concurrency tier, which has no window to project
/// a free slot from.
const SLOT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Store key of the global concurrency counter.
const SLOT_KEY: &str = "slot:g";

enum TierCheck {
    Pass,
    Deny {
        tier: LimitTier,
        retry_after: Duration,
    },
    Degraded,
}

/// Sliding-window + cost-ledger admission control. Independent of the
/// cache tiers; shares only the store.
pub struct RateLimiter {
    store: Arc<dyn SharedStore>,
    config: RateLimitConfig,
    store_timeout: Duration,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn SharedStore>,
        config: RateLimitConfig,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            config,
            store_timeout,
        }
    }

    /// Decide whether `subject` may proceed.
    ///
    /// `cost_hint` is advisory only — it is logged for operators but
    /// never pre-charged against the ledger; enforcement is post-hoc via
    /// [`record_cost`](Self::record_cost).
    ///
    /// On denial, window events recorded by earlier tiers in this call
    /// are rolled back best-effort, so a denied request consumes no
    /// quota.
    pub async fn admit(&self, subject: &str, cost_hint: f64) -> Decision {
        debug!(subject, cost_hint, "admission check");
        let mut recorded: Vec<(String, u64)> = Vec::new();
        let mut slot: Option<SlotGuard> = None;

        let user_windows = [
            (
                LimitTier::PerMinute,
                self.config.per_minute,
                format!("w:u:{subject}:m"),
                MINUTE,
            ),
            (
                LimitTier::PerHour,
                self.config.per_hour,
                format!("w:u:{subject}:h"),
                HOUR,
            ),
            (
                LimitTier::PerDay,
                self.config.per_day,
                format!("w:u:{subject}:d"),
                DAY,
            ),
        ];

        for (tier, limit, key, window) in user_windows {
            match self.check_window(tier, &key, window, limit, &mut recorded).await {
                TierCheck::Pass => {}
                TierCheck::Deny { tier, retry_after } => {
                    return self.deny(tier, retry_after, recorded, slot).await;
                }
                TierCheck::Degraded => return self.degrade(slot),
            }
        }

        if let Some(max) = self.config.max_concurrent {
            match self.store_call(self.store.slot_acquire(SLOT_KEY, max)).await {
                Ok(true) => slot = Some(SlotGuard::new(self.store.clone(), SLOT_KEY)),
                Ok(false) => {
                    return self
                        .deny(LimitTier::Concurrency, SLOT_RETRY_AFTER, recorded, slot)
                        .await;
                }
                Err(e) => {
                    self.note_store_error(&e);
                    return self.degrade(slot);
                }
            }
        }

        match self
            .check_window(
                LimitTier::GlobalHourly,
                "w:g:h",
                HOUR,
                self.config.global_hourly,
                &mut recorded,
            )
            .await
        {
            TierCheck::Pass => {}
            TierCheck::Deny { tier, retry_after } => {
                return self.deny(tier, retry_after, recorded, slot).await;
            }
            TierCheck::Degraded => return self.degrade(slot),
        }

        let day = utc_day_key();
        let cost_tiers = [
            (
                LimitTier::UserDailyCost,
                self.config.user_daily_cost_usd,
                format!("cost:u:{subject}:{day}"),
            ),
            (
                LimitTier::GlobalDailyCost,
                self.config.global_daily_cost_usd,
                format!("cost:g:{day}"),
            ),
        ];

        for (tier, limit, key) in cost_tiers {
            match self.check_cost(tier, &key, limit).await {
                TierCheck::Pass => {}
                TierCheck::Deny { tier, retry_after } => {
                    return self.deny(tier, retry_after, recorded, slot).await;
                }
                TierCheck::Degraded => return self.degrade(slot),
            }
        }

        metrics::counter!(telemetry::ADMISSION_DECISIONS_TOTAL, "decision" => "allowed")
            .increment(1);
        Decision::Allowed { slot }
    }

    /// Append `actual_cost` to the subject and global daily ledgers.
    ///
    /// Called at the end of a request, once generation cost is known.
    /// Affects only future admission decisions. Store failures are
    /// absorbed: a missed ledger write under-counts rather than failing
    /// the completed request.
    pub async fn record_cost(&self, subject: &str, actual_cost: f64) {
        if actual_cost <= 0.0 {
            return;
        }
        let day = utc_day_key();
        for key in [format!("cost:u:{subject}:{day}"), format!("cost:g:{day}")] {
            match self.store_call(self.store.cost_add(&key, actual_cost, COST_TTL)).await {
                Ok(total) => debug!(key, actual_cost, total, "cost recorded"),
                Err(e) => {
                    self.note_store_error(&e);
                    warn!(key, actual_cost, error = %e, "cost record failed");
                }
            }
        }
    }

    /// Requests currently holding a concurrency slot, as seen by the
    /// store. Exposed for operational introspection and tests.
    pub async fn in_flight(&self) -> StoreResult<u32> {
        self.store_call(self.store.slot_value(SLOT_KEY)).await
    }

    // ========================================================================
    // Tier checks
    // ========================================================================

    async fn check_window(
        &self,
        tier: LimitTier,
        key: &str,
        window: Duration,
        limit: Option<u32>,
        recorded: &mut Vec<(String, u64)>,
    ) -> TierCheck {
        let Some(limit) = limit else {
            return TierCheck::Pass;
        };
        match self.store_call(self.store.window_admit(key, window, limit)).await {
            Ok(outcome) if outcome.admitted => {
                if let Some(token) = outcome.token {
                    recorded.push((key.to_owned(), token));
                }
                TierCheck::Pass
            }
            Ok(outcome) => TierCheck::Deny {
                tier,
                retry_after: window_retry_after(&outcome, window),
            },
            Err(e) => {
                self.note_store_error(&e);
                TierCheck::Degraded
            }
        }
    }

    async fn check_cost(&self, tier: LimitTier, key: &str, limit: Option<f64>) -> TierCheck {
        let Some(limit) = limit else {
            return TierCheck::Pass;
        };
        match self.store_call(self.store.cost_get(key)).await {
            Ok(spend) if spend < limit => TierCheck::Pass,
            Ok(spend) => {
                debug!(key, spend, limit, "daily cost budget exhausted");
                TierCheck::Deny {
                    tier,
                    retry_after: Duration::from_secs(seconds_until_utc_midnight()),
                }
            }
            Err(e) => {
                self.note_store_error(&e);
                TierCheck::Degraded
            }
        }
    }

    // ========================================================================
    // Outcomes
    // ========================================================================

    async fn deny(
        &self,
        tier: LimitTier,
        retry_after: Duration,
        recorded: Vec<(String, u64)>,
        slot: Option<SlotGuard>,
    ) -> Decision {
        // Give back quota taken by tiers that passed before this one.
        for (key, token) in recorded {
            if let Err(e) = self.store_call(self.store.window_remove(&key, token)).await {
                debug!(key, error = %e, "window rollback failed");
            }
        }
        if let Some(guard) = slot {
            guard.release().await;
        }
        metrics::counter!(
            telemetry::ADMISSION_DECISIONS_TOTAL,
            "decision" => "denied",
            "tier" => tier.as_str(),
        )
        .increment(1);
        debug!(%tier, retry_after_ms = retry_after.as_millis() as u64, "admission denied");
        Decision::Denied { tier, retry_after }
    }

    fn degrade(&self, slot: Option<SlotGuard>) -> Decision {
        metrics::counter!(telemetry::ADMISSION_DECISIONS_TOTAL, "decision" => "degraded")
            .increment(1);
        warn!("shared store unreachable; admitting fail-open");
        Decision::DegradedAllowed { slot }
    }

    fn note_store_error(&self, e: &StoreError) {
        metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "component" => "limiter").increment(1);
        debug!(error = %e, "store error in limiter");
    }

    async fn store_call<T>(
        &self,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout)),
        }
    }
}

/// `oldest_entry + window − now`, clamped into `(0, window]`.
fn window_retry_after(outcome: &WindowOutcome, window: Duration) -> Duration {
    match outcome.oldest {
        Some(oldest) => (oldest + window)
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::from_millis(1))
            .max(Duration::from_millis(1))
            .min(window),
        None => window,
    }
}

fn utc_day_key() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn seconds_until_utc_midnight() -> u64 {
    let elapsed = u64::from(Utc::now().time().num_seconds_from_midnight());
    (86_400 - elapsed).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_stays_within_window() {
        let window = Duration::from_secs(60);
        let outcome = WindowOutcome {
            admitted: false,
            count: 10,
            oldest: Some(SystemTime::now() - Duration::from_secs(30)),
            token: None,
        };
        let retry = window_retry_after(&outcome, window);
        assert!(retry > Duration::ZERO);
        assert!(retry <= window);
    }

    #[test]
    fn retry_after_positive_even_for_stale_oldest() {
        let window = Duration::from_secs(60);
        let outcome = WindowOutcome {
            admitted: false,
            count: 1,
            oldest: Some(SystemTime::now() - Duration::from_secs(120)),
            token: None,
        };
        assert!(window_retry_after(&outcome, window) > Duration::ZERO);
    }

    #[test]
    fn midnight_countdown_is_bounded() {
        let secs = seconds_until_utc_midnight();
        assert!(secs >= 1);
        assert!(secs <= 86_400);
    }
}
