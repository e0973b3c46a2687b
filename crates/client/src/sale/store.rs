//! Keyed read-through cache with a fixed freshness window.
//!
//! Fresh entries are served without I/O. A stale or missing entry triggers the
//! caller's fetch; on success the entry is replaced whole, on failure the old
//! entry is left untouched and the caller's fallback is returned uncached.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// A stored value and when it was fetched.
#[derive(Debug)]
pub struct CachedValue<V> {
    pub value: Arc<V>,
    pub fetched_at: Instant,
}

impl<V> CachedValue<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// In-memory read-through cache.
///
/// Concurrent stale reads for the same key each run their own fetch; the last
/// one to finish wins.
pub struct ReadThroughStore<V> {
    entries: RwLock<HashMap<String, Arc<CachedValue<V>>>>,
    ttl: Duration,
}

impl<V> ReadThroughStore<V> {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The stored entry for `key`, fresh or not.
    pub fn entry(&self, key: &str) -> Option<Arc<CachedValue<V>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    /// The stored value for `key` if it is still fresh.
    pub fn fresh(&self, key: &str) -> Option<Arc<V>> {
        self.entry(key).filter(|entry| entry.is_fresh(self.ttl)).map(|entry| Arc::clone(&entry.value))
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(key);
    }

    fn replace(&self, key: &str, value: Arc<V>) {
        let entry = Arc::new(CachedValue { value, fetched_at: Instant::now() });
        self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(key.to_string(), entry);
    }

    /// Return the fresh value for `key`, or refresh it with `fetch`.
    ///
    /// `fetch` is only polled on a miss. Its failure is logged and absorbed:
    /// the result of `fallback` is returned and nothing is stored.
    pub async fn get<E, Fut>(&self, key: &str, fetch: Fut, fallback: impl FnOnce() -> V) -> Arc<V>
    where
        E: Display,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.fresh(key) {
            tracing::debug!(key, "read-through hit");
            return value;
        }

        match fetch.await {
            Ok(value) => {
                let value = Arc::new(value);
                self.replace(key, Arc::clone(&value));
                tracing::debug!(key, "read-through refreshed");
                value
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "remote read failed; serving fallback");
                Arc::new(fallback())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_millis(10_000);

    async fn fetch_ok(calls: &AtomicUsize, value: u32) -> Result<u32, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    async fn fetch_err(calls: &AtomicUsize) -> Result<u32, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Err("unreachable".into())
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_skips_fetch() {
        let store = ReadThroughStore::new(TTL);
        let calls = AtomicUsize::new(0);

        let first = store.get("k", fetch_ok(&calls, 1), || 0).await;
        tokio::time::advance(Duration::from_millis(9_999)).await;
        let second = store.get("k", fetch_ok(&calls, 2), || 0).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_ttl() {
        let store = ReadThroughStore::new(TTL);
        let calls = AtomicUsize::new(0);

        store.get("k", fetch_ok(&calls, 1), || 0).await;
        tokio::time::advance(TTL).await;
        let value = store.get("k", fetch_ok(&calls, 2), || 0).await;

        assert_eq!(*value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_stale_entry() {
        let store = ReadThroughStore::new(TTL);
        let calls = AtomicUsize::new(0);

        store.get("k", fetch_ok(&calls, 7), || 0).await;
        let stored_at = store.entry("k").unwrap().fetched_at;

        tokio::time::advance(Duration::from_millis(11_000)).await;
        let value = store.get("k", fetch_err(&calls), || 99).await;

        assert_eq!(*value, 99);
        let entry = store.entry("k").unwrap();
        assert_eq!(*entry.value, 7);
        assert_eq!(entry.fetched_at, stored_at);
        assert!(store.fresh("k").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_without_entry_stores_nothing() {
        let store: ReadThroughStore<u32> = ReadThroughStore::new(TTL);
        let calls = AtomicUsize::new(0);

        assert_eq!(*store.get("k", fetch_err(&calls), || 5).await, 5);
        assert!(store.entry("k").is_none());

        store.get("k", fetch_err(&calls), || 5).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let store = ReadThroughStore::new(TTL);
        let calls = AtomicUsize::new(0);

        store.get("a", fetch_ok(&calls, 1), || 0).await;
        tokio::time::advance(Duration::from_millis(6_000)).await;
        store.get("b", fetch_ok(&calls, 2), || 0).await;
        tokio::time::advance(Duration::from_millis(6_000)).await;

        assert!(store.fresh("a").is_none());
        assert_eq!(store.fresh("b").as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let store = ReadThroughStore::new(TTL);
        let calls = AtomicUsize::new(0);

        store.get("k", fetch_ok(&calls, 1), || 0).await;
        store.invalidate("k");
        assert!(store.entry("k").is_none());

        assert_eq!(*store.get("k", fetch_ok(&calls, 2), || 0).await, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
