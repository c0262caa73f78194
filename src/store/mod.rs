//! Shared key-value store abstraction.
//!
//! Rate-limit windows, the concurrency slot, cost ledgers, and all three
//! cache tiers live behind [`SharedStore`] rather than in process globals,
//! so correctness holds when the service runs as multiple instances.
//!
//! Every method is one indivisible operation. In particular
//! [`SharedStore::window_admit`] performs prune + count + conditional
//! insert as a single step — a separate read followed by a separate write
//! is racy and could admit more than `limit` requests simultaneously.
//!
//! The shipped implementation is [`MemoryStore`] (single-process; one lock
//! held across each operation). A redis-backed implementation would map
//! `window_admit` to a Lua script over a sorted set, the slot to
//! `INCR`/`DECR` with a ceiling check, and `delete_prefix` to a `SCAN` +
//! `DEL` loop; the trait is the injection point, via the pipeline builder.
//!
//! # Failure semantics
//!
//! Callers never treat [`StoreError`] as fatal: the rate limiter fails
//! open ([`Decision::DegradedAllowed`](crate::limiter::Decision)), cache
//! tiers treat it as an unconditional miss. Errors surface only in logs
//! and metrics.

pub mod memory;

use std::time::{Duration, SystemTime};

use async_trait::async_trait;

pub use memory::MemoryStore;

/// Error talking to the shared store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of an atomic sliding-window check-and-record.
#[derive(Debug, Clone, Copy)]
pub struct WindowOutcome {
    /// Whether an event was recorded (count was under the limit).
    pub admitted: bool,
    /// Events in the window after the operation.
    pub count: u32,
    /// Timestamp of the oldest surviving event; drives `retry_after`.
    pub oldest: Option<SystemTime>,
    /// Identifies the recorded event for best-effort rollback via
    /// [`SharedStore::window_remove`]. `None` when not admitted.
    pub token: Option<u64>,
}

/// Shared mutable state accessed by an unbounded number of concurrent
/// callers. See module docs for atomicity and failure semantics.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Atomically prune events older than `window`, count the remainder,
    /// and record a new event if the count is under `limit`.
    async fn window_admit(
        &self,
        key: &str,
        window: Duration,
        limit: u32,
    ) -> StoreResult<WindowOutcome>;

    /// Remove a previously recorded window event (rollback after a later
    /// tier denies). Best-effort: a missing event is not an error.
    async fn window_remove(&self, key: &str, token: u64) -> StoreResult<()>;

    /// Increment the named counter if it is below `max`. Returns whether
    /// the slot was acquired. The counter never exceeds `max`.
    async fn slot_acquire(&self, key: &str, max: u32) -> StoreResult<bool>;

    /// Decrement the named counter, saturating at zero.
    async fn slot_release(&self, key: &str) -> StoreResult<()>;

    /// Current value of the named counter.
    async fn slot_value(&self, key: &str) -> StoreResult<u32>;

    /// Add `amount` to a running monetary sum, creating the entry with
    /// `ttl` on first write. Returns the new total.
    async fn cost_add(&self, key: &str, amount: f64, ttl: Duration) -> StoreResult<f64>;

    /// Current value of a running monetary sum (0 when absent/expired).
    async fn cost_get(&self, key: &str) -> StoreResult<f64>;

    /// Fetch a cache value. Expired entries read as absent.
    async fn kv_get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store a cache value with a per-entry TTL. Last writer wins.
    async fn kv_put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Delete every cache value whose key starts with `prefix`. Returns
    /// the number of entries removed.
    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64>;
}
