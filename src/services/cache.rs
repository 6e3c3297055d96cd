// src/services/cache.rs
use log::debug;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

struct Entry<V> {
    value: Arc<V>,
    stored_at: Instant,
}

type Slot<V> = Arc<AsyncMutex<Option<Entry<V>>>>;

/// In-memory, time-boxed cache.
///
/// Each key has its own async lock, so concurrent misses on the same key wait
/// for the first fetch instead of all hitting upstream.
pub struct TtlCache<V> {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot<V>>>,
}

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &str) -> Slot<V> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }

    /// Returns the cached value if still fresh, otherwise runs `fetch` and
    /// stores its result. `force_refresh` skips the freshness check.
    /// The boolean is true when the value came from the cache.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, force_refresh: bool, fetch: F) -> (Arc<V>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let slot = self.slot(key);
        let mut entry = slot.lock().await;

        if !force_refresh {
            if let Some(cached) = entry.as_ref() {
                if cached.stored_at.elapsed() < self.ttl {
                    debug!("Cache hit for '{}' (age {:?})", key, cached.stored_at.elapsed());
                    return (cached.value.clone(), true);
                }
                debug!("Cache entry for '{}' expired", key);
            }
        }

        let value = Arc::new(fetch().await);
        *entry = Some(Entry {
            value: value.clone(),
            stored_at: Instant::now(),
        });
        (value, false)
    }

}
