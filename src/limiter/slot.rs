//! Scoped acquisition of the global concurrency slot.

use std::sync::Arc;

use tracing::warn;

use crate::store::SharedStore;

/// RAII handle for one unit of the global concurrency counter.
///
/// The counter is decremented exactly once per guard, on every exit path
/// of the surrounding request: success, error, timeout, and client
/// cancellation all end with this guard dropping. Prefer
/// [`release`](Self::release) where an await point is available — `Drop`
/// has to dispatch the store decrement onto the runtime, so it completes
/// slightly after the guard goes away.
pub struct SlotGuard {
    store: Arc<dyn SharedStore>,
    key: &'static str,
    released: bool,
}

impl std::fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard")
            .field("key", &self.key)
            .field("released", &self.released)
            .finish()
    }
}

impl SlotGuard {
    pub(crate) fn new(store: Arc<dyn SharedStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            released: false,
        }
    }

    /// Release the slot inline. Store failures are logged and absorbed;
    /// the slot is considered released either way so it is never
    /// decremented twice.
    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = self.store.slot_release(self.key).await {
            warn!(key = self.key, error = %e, "slot release failed against store");
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let store = self.store.clone();
        let key = self.key;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = store.slot_release(key).await {
                        warn!(key, error = %e, "slot release failed against store");
                    }
                });
            }
            Err(_) => {
                warn!(key, "slot guard dropped outside a runtime; slot leaked");
            }
        }
    }
}
