//! Time-bounded memo table with a per-key "compute once, others wait" guard.
//!
//! Entries carry their creation time and are recomputed lazily on the first
//! access after they expire. There is no background eviction.
//!
//! Two locks are involved:
//! - a short synchronous lock over the key -> slot map (lookup/insert only)
//! - one async lock per slot, held while that key is being computed
//!
//! Concurrent callers for the same key queue on the slot lock and see the
//! value the first caller stored. Callers for different keys never wait on
//! each other's computation.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::warn;
use tokio::sync::Mutex as AsyncMutex;

struct CacheEntry<V> {
    value: V,
    created: Instant,
}

type Slot<V> = Arc<AsyncMutex<Option<CacheEntry<V>>>>;

/// Memo table keyed by `K` with a fixed time-to-live.
pub struct CacheDictionary<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> CacheDictionary<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        self.slots.lock().unwrap_or_else(|poisoned| {
            warn!("Cache slot map mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = self.lock_slots();
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Return the cached value for `key`, computing it when missing or expired.
    ///
    /// Errors from `compute` are returned to the caller and not cached, so the
    /// next access retries.
    pub async fn try_get_or_compute<F, Fut, E>(&self, key: &K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.created.elapsed() < self.ttl {
                return Ok(cached.value.clone());
            }
        }

        let value = compute().await?;
        *entry = Some(CacheEntry {
            value: value.clone(),
            created: Instant::now(),
        });
        Ok(value)
    }

    /// The cached value if present and fresh. Never waits for a computation.
    pub fn peek(&self, key: &K) -> Option<V> {
        let slot = self.lock_slots().get(key).cloned()?;
        let entry = slot.try_lock().ok()?;
        let value = entry
            .as_ref()
            .filter(|cached| cached.created.elapsed() < self.ttl)
            .map(|cached| cached.value.clone());
        value
    }

    /// Number of keys that have been requested at least once.
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_value_is_memoized_within_ttl() {
        let cache: CacheDictionary<&str, usize> = CacheDictionary::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .try_get_or_compute(&"kraken", || async {
                    Ok::<_, Infallible>(calls.fetch_add(1, Ordering::SeqCst) + 10)
                })
                .await
                .unwrap();
            assert_eq!(value, 10);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(&"kraken"), Some(10));
    }

    #[tokio::test]
    async fn test_expired_entry_is_recomputed() {
        let cache: CacheDictionary<&str, usize> = CacheDictionary::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .try_get_or_compute(&"kraken", || async {
                    Ok::<_, Infallible>(calls.fetch_add(1, Ordering::SeqCst))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek(&"kraken"), None);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: CacheDictionary<&str, usize> = CacheDictionary::new(Duration::from_secs(60));

        let failed = cache
            .try_get_or_compute(&"exmo", || async { Err::<usize, _>("boom") })
            .await;
        assert_eq!(failed, Err("boom"));

        let value = cache
            .try_get_or_compute(&"exmo", || async { Ok::<_, &str>(7) })
            .await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_compute_once() {
        let cache: Arc<CacheDictionary<String, usize>> =
            Arc::new(CacheDictionary::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .try_get_or_compute(&"bitstamp".to_string(), || async {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, Infallible>(calls.fetch_add(1, Ordering::SeqCst))
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), 0);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
