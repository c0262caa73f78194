//! Single-process [`SharedStore`] implementation.
//!
//! Windows, slots, and cost ledgers are `parking_lot`-mutexed maps — one
//! lock held across prune + count + insert gives each operation the
//! atomicity the trait requires. Cache values go through a moka cache
//! with per-entry TTL (an [`Expiry`] reading the TTL stored alongside the
//! bytes).
//!
//! Suitable for a single service instance and for tests. Multi-instance
//! deployments need a store shared between processes (see module docs on
//! [`super`]).

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use parking_lot::Mutex;

use super::{SharedStore, StoreResult, WindowOutcome};

/// Default maximum number of cached values.
const DEFAULT_KV_CAPACITY: u64 = 100_000;

/// Idle window keys older than this are dropped wholesale on access of
/// the window map (TTL slightly longer than the largest window).
const WINDOW_RETENTION: Duration = Duration::from_secs(25 * 60 * 60);

#[derive(Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

struct CostEntry {
    total: f64,
    expires_at: u64,
}

/// In-process shared store backed by mutexed maps and a moka cache.
pub struct MemoryStore {
    windows: Mutex<HashMap<String, VecDeque<u64>>>,
    slots: Mutex<HashMap<String, u32>>,
    costs: Mutex<HashMap<String, CostEntry>>,
    kv: Cache<String, StoredValue>,
}

impl MemoryStore {
    /// Create a store with the default cache capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_KV_CAPACITY)
    }

    /// Create a store with a custom cache capacity.
    pub fn with_capacity(max_entries: u64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            slots: Mutex::new(HashMap::new()),
            costs: Mutex::new(HashMap::new()),
            kv: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos() as u64
}

fn nanos_to_system_time(nanos: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(nanos)
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn window_admit(
        &self,
        key: &str,
        window: Duration,
        limit: u32,
    ) -> StoreResult<WindowOutcome> {
        let now = now_nanos();
        let cutoff = now.saturating_sub(window.as_nanos() as u64);

        let mut windows = self.windows.lock();

        // Opportunistic GC: drop events past retention for all keys when
        // the map has grown; otherwise only the touched key is pruned.
        if windows.len() > 10_000 {
            let retention_cutoff = now.saturating_sub(WINDOW_RETENTION.as_nanos() as u64);
            windows.retain(|_, events| {
                while events.front().is_some_and(|&t| t < retention_cutoff) {
                    events.pop_front();
                }
                !events.is_empty()
            });
        }

        let events = windows.entry(key.to_owned()).or_default();
        while events.front().is_some_and(|&t| t < cutoff) {
            events.pop_front();
        }

        let count = events.len() as u32;
        if count < limit {
            events.push_back(now);
            Ok(WindowOutcome {
                admitted: true,
                count: count + 1,
                oldest: events.front().copied().map(nanos_to_system_time),
                token: Some(now),
            })
        } else {
            Ok(WindowOutcome {
                admitted: false,
                count,
                oldest: events.front().copied().map(nanos_to_system_time),
                token: None,
            })
        }
    }

    async fn window_remove(&self, key: &str, token: u64) -> StoreResult<()> {
        let mut windows = self.windows.lock();
        if let Some(events) = windows.get_mut(key) {
            if let Some(pos) = events.iter().rposition(|&t| t == token) {
                events.remove(pos);
            }
            if events.is_empty() {
                windows.remove(key);
            }
        }
        Ok(())
    }

    async fn slot_acquire(&self, key: &str, max: u32) -> StoreResult<bool> {
        let mut slots = self.slots.lock();
        let value = slots.entry(key.to_owned()).or_insert(0);
        if *value < max {
            *value += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn slot_release(&self, key: &str) -> StoreResult<()> {
        let mut slots = self.slots.lock();
        if let Some(value) = slots.get_mut(key) {
            *value = value.saturating_sub(1);
        }
        Ok(())
    }

    async fn slot_value(&self, key: &str) -> StoreResult<u32> {
        Ok(self.slots.lock().get(key).copied().unwrap_or(0))
    }

    async fn cost_add(&self, key: &str, amount: f64, ttl: Duration) -> StoreResult<f64> {
        let now = now_nanos();
        let mut costs = self.costs.lock();
        let entry = costs.entry(key.to_owned()).or_insert(CostEntry {
            total: 0.0,
            expires_at: now + ttl.as_nanos() as u64,
        });
        if entry.expires_at <= now {
            // Day rolled over since the last write.
            entry.total = 0.0;
            entry.expires_at = now + ttl.as_nanos() as u64;
        }
        entry.total += amount;
        Ok(entry.total)
    }

    async fn cost_get(&self, key: &str) -> StoreResult<f64> {
        let now = now_nanos();
        let costs = self.costs.lock();
        Ok(costs
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.total)
            .unwrap_or(0.0))
    }

    async fn kv_get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.kv.get(key).await.map(|v| v.bytes))
    }

    async fn kv_put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.kv
            .insert(key.to_owned(), StoredValue { bytes: value, ttl })
            .await;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let matching: Vec<String> = self
            .kv
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| (*k).clone())
            .collect();
        let mut removed = 0;
        for key in matching {
            self.kv.invalidate(&key).await;
            removed += 1;
        }
        Ok(removed)
    }
}
