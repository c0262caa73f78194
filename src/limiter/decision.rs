//! Admission decision types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::slot::SlotGuard;

/// The admission tier that refused a request.
///
/// Order here mirrors evaluation order in
/// [`RateLimiter::admit`](super::RateLimiter::admit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitTier {
    PerMinute,
    PerHour,
    PerDay,
    Concurrency,
    GlobalHourly,
    UserDailyCost,
    GlobalDailyCost,
}

impl LimitTier {
    /// Stable snake_case name for logs, metrics, and client responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitTier::PerMinute => "per_minute",
            LimitTier::PerHour => "per_hour",
            LimitTier::PerDay => "per_day",
            LimitTier::Concurrency => "concurrency",
            LimitTier::GlobalHourly => "global_hourly",
            LimitTier::UserDailyCost => "user_daily_cost",
            LimitTier::GlobalDailyCost => "global_daily_cost",
        }
    }
}

impl std::fmt::Display for LimitTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state admission outcome.
///
/// `DegradedAllowed` is deliberately not collapsed into `Allowed`: tests
/// and operators must be able to tell normal operation from store-outage
/// fallback.
#[derive(Debug)]
pub enum Decision {
    /// All configured tiers passed. The guard releases the concurrency
    /// slot when dropped; it must live for the rest of the request.
    Allowed {
        slot: Option<SlotGuard>,
    },
    /// A tier refused the request.
    Denied {
        tier: LimitTier,
        retry_after: Duration,
    },
    /// The shared store was unreachable; the request is admitted
    /// fail-open, unchecked. `slot` is present only if acquisition
    /// succeeded before the store degraded.
    DegradedAllowed {
        slot: Option<SlotGuard>,
    },
}

impl Decision {
    /// Whether the request may proceed.
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Decision::Denied { .. })
    }

    /// Whether this admission went through store-outage fallback.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Decision::DegradedAllowed { .. })
    }
}
