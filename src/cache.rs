//! Read-through TTL cache in front of the fetch path
//!
//! Entries are keyed by an opaque string combining the operation name and its
//! parameters, and are replaced wholesale on refresh; a failed fetch is never
//! cached and its error passes through unchanged. The map is bounded: when
//! full, expired entries are swept first and the oldest stored entry goes
//! next, so identifier-parameterized lookups cannot grow without limit over a
//! long-running process.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Builds the cache key for an operation with one parameter
pub fn cache_key(operation: &str, parameter: &str) -> String {
    format!("{operation}:{parameter}")
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) >= self.ttl
    }
}

/// Per-operation read-through cache with per-entry TTLs
///
/// Values are heterogeneous across operations; each slot remembers the
/// concrete type it was stored with and a lookup under a different type is
/// simply a miss. Access is guarded so concurrent fan-out within one
/// operation stays safe.
pub struct CacheLayer {
    entries: RwLock<HashMap<String, CacheEntry>>,
    capacity: usize,
}

impl CacheLayer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Returns the cached value for `key` while it is still fresh, otherwise
    /// runs `fetch` and stores its result under `ttl`
    ///
    /// Freshness is judged by the TTL recorded when the entry was stored,
    /// the same notion the capacity sweep uses. A cache hit performs zero
    /// network activity. On fetch failure nothing is stored, any previously
    /// expired entry stays expired, and the error is returned unchanged.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup::<T>(key).await {
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }

        tracing::debug!(key, "cache miss");
        let value = fetch().await?;
        self.store(key, value.clone(), ttl).await;
        Ok(value)
    }

    /// Number of live slots, including not-yet-swept expired ones
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn lookup<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            None
        } else {
            entry.value.downcast_ref::<T>().cloned()
        }
    }

    async fn store<T>(&self, key: &str, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            Self::make_room(&mut entries, self.capacity);
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: Arc::new(value),
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drops expired entries, then the oldest stored one if still at capacity
    fn make_room(entries: &mut HashMap<String, CacheEntry>, capacity: usize) {
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now));

        if entries.len() >= capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                tracing::debug!(key = %key, "evicting oldest cache entry");
                entries.remove(&key);
            }
        }
    }
}
